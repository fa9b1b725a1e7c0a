//! Stroke Canvas Library
//!
//! A wgpu painting canvas that accumulates pointer strokes as capsule
//! segments in one GPU instance buffer and redraws them every frame with a
//! single indirect draw. It runs:
//! - Standalone on desktop (see `main.rs`)
//! - In a browser via WASM, driven from JavaScript through [`CanvasHandle`]
//!
//! The core (store, tracker, presets, SVG) is independent of the windowing
//! and GPU layers, which live in `renderer` and `window`.

pub mod app;
pub mod arc_length;
pub mod brush;
pub mod brush_texture;
pub mod color;
pub mod config;
pub mod debug;
pub mod error;
pub mod input;
pub mod preset;
mod renderer;
pub mod segment;
pub mod store;
pub mod svg;
pub mod view;
mod window;

pub use app::App;
pub use brush::{BrushConfig, BrushType};
pub use config::CanvasConfig;
pub use error::CanvasError;
pub use input::{InputQueue, InputTracker, PointerEvent, PointerEventType};
pub use renderer::{BlendColorSpace, Renderer, StrokePipelineConfig};
pub use segment::Segment;
pub use store::StrokeStore;
pub use window::{AppWrapper, Shortcut};

#[cfg(not(target_arch = "wasm32"))]
pub use window::save_drawing;

// Re-export for WASM builds
#[cfg(target_arch = "wasm32")]
pub use wasm_bindgen;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use winit::event_loop::{ControlFlow, EventLoop};
    use winit::platform::web::EventLoopExtWebSys;

    use crate::{App, AppWrapper, BlendColorSpace, BrushType, CanvasConfig};

    /// WASM entry point - called when the module is loaded
    #[wasm_bindgen(start)]
    pub fn wasm_start() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Debug) {
            web_sys::console::error_1(&format!("logger init failed: {}", e).into());
        }
        log::info!("🚀 Stroke canvas WASM module started");
    }

    /// JavaScript-facing handle to a running canvas
    ///
    /// Created by [`start_canvas`]. Every method forwards to the shared
    /// [`App`]; changes show up on the next animation frame.
    #[wasm_bindgen]
    pub struct CanvasHandle {
        app: Rc<RefCell<App>>,
    }

    /// Create the window, spawn the event loop and return a handle to it
    #[wasm_bindgen]
    pub fn start_canvas() -> Result<CanvasHandle, JsValue> {
        let app = Rc::new(RefCell::new(App::new(CanvasConfig::default())));

        let event_loop = EventLoop::new().map_err(|e| JsValue::from_str(&e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop.spawn_app(AppWrapper::new(app.clone()));

        Ok(CanvasHandle { app })
    }

    #[wasm_bindgen]
    impl CanvasHandle {
        /// Set the brush color from sRGB components in 0..1
        pub fn set_brush_color(&self, r: f32, g: f32, b: f32, a: f32) {
            self.app.borrow_mut().set_brush_color([r, g, b, a]);
        }

        /// Set the brush color from any CSS color string
        pub fn set_brush_color_css(&self, css: &str) -> Result<(), JsValue> {
            let color = crate::color::parse_css_color(css)?;
            self.app.borrow_mut().set_brush_color(color);
            Ok(())
        }

        pub fn set_brush_radius(&self, radius: f32) {
            self.app.borrow_mut().set_brush_radius(radius);
        }

        /// 0 vanilla, 1 stamp, 2 airbrush, 3 eraser
        pub fn set_brush_type(&self, brush_type: u32) -> Result<(), JsValue> {
            let brush_type = BrushType::try_from(brush_type)?;
            self.app.borrow_mut().set_brush_type(brush_type);
            Ok(())
        }

        pub fn set_eraser(&self, eraser: bool) {
            self.app.borrow_mut().set_eraser(eraser);
        }

        pub fn undo(&self) {
            self.app.borrow_mut().undo();
        }

        pub fn redo(&self) {
            self.app.borrow_mut().redo();
        }

        pub fn clear(&self) {
            self.app.borrow_mut().clear();
        }

        /// Set the blend color space
        ///
        /// # Arguments
        /// * `is_srgb` - true for sRGB gamma-space blending, false for linear blending
        pub fn set_blend_color_space(&self, is_srgb: bool) {
            let color_space = if is_srgb {
                BlendColorSpace::Srgb
            } else {
                BlendColorSpace::Linear
            };
            self.app.borrow_mut().set_blend_color_space(color_space);
        }

        pub fn export_preset(&self) -> Result<String, JsValue> {
            Ok(self.app.borrow().export_preset()?)
        }

        /// Replace the drawing; returns the number of imported segments
        pub fn import_preset(&self, json: &str) -> Result<usize, JsValue> {
            Ok(self.app.borrow_mut().import_preset(json)?)
        }

        pub fn export_svg(&self) -> String {
            self.app.borrow().export_svg()
        }

        /// Load a PNG stamp for the stamp brush
        pub fn load_brush_texture(&self, png: &[u8]) -> Result<(), JsValue> {
            Ok(self.app.borrow_mut().load_brush_texture(png)?)
        }

        /// Visible segment count
        pub fn segment_count(&self) -> usize {
            self.app.borrow().store().instance_count()
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{start_canvas, CanvasHandle};
