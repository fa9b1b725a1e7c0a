//! Window and Event Loop Management
//!
//! This module contains the shared windowing logic used by both
//! WASM (lib.rs) and desktop (main.rs) entry points. winit events are
//! translated into pointer events and canvas commands here; the `App` itself
//! never sees winit types.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Window, WindowId};

use crate::brush::BrushType;
use crate::error::CanvasError;
use crate::input::{PointerButton, PointerEvent, PointerEventType};
use crate::{App, Renderer};

/// Pixels of trackpad scroll that count as one wheel line
const PIXELS_PER_LINE: f64 = 50.0;

/// Radius change per `[` / `]` press
const RADIUS_STEP: f32 = 1.25;

/// Keyboard commands available on desktop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shortcut {
    Undo,
    Redo,
    Clear,
    BrushType(BrushType),
    ToggleEraser,
    ShrinkRadius,
    GrowRadius,
    ResetView,
    Save,
}

impl Shortcut {
    /// Map a pressed key and the active modifiers to a command
    pub fn from_key(key: &Key, modifiers: ModifiersState) -> Option<Self> {
        let command = modifiers.control_key() || modifiers.super_key();
        match key {
            Key::Named(NamedKey::Delete) => Some(Shortcut::Clear),
            Key::Character(text) => {
                let text = text.to_lowercase();
                match (text.as_str(), command) {
                    ("z", true) if modifiers.shift_key() => Some(Shortcut::Redo),
                    ("z", true) => Some(Shortcut::Undo),
                    ("y", true) => Some(Shortcut::Redo),
                    ("s", true) => Some(Shortcut::Save),
                    ("e", false) => Some(Shortcut::ToggleEraser),
                    ("[", false) => Some(Shortcut::ShrinkRadius),
                    ("]", false) => Some(Shortcut::GrowRadius),
                    ("0", false) => Some(Shortcut::ResetView),
                    ("1", false) => Some(Shortcut::BrushType(BrushType::Vanilla)),
                    ("2", false) => Some(Shortcut::BrushType(BrushType::Stamp)),
                    ("3", false) => Some(Shortcut::BrushType(BrushType::Airbrush)),
                    ("4", false) => Some(Shortcut::BrushType(BrushType::Eraser)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Middle => Some(PointerButton::Middle),
        MouseButton::Right => Some(PointerButton::Secondary),
        _ => None,
    }
}

/// Wrapper for the application window and state
pub struct AppWrapper {
    window: Option<Arc<Window>>,
    renderer: Rc<RefCell<Option<Renderer>>>,
    app: Rc<RefCell<App>>,
    modifiers: ModifiersState,
    /// Last cursor position in physical pixels
    cursor: [f32; 2],
    /// Fatal initialization error, reported by `take_error`
    error: Option<CanvasError>,
    /// File stem for Ctrl+S saves
    #[cfg(not(target_arch = "wasm32"))]
    output: std::path::PathBuf,
}

impl AppWrapper {
    /// Create a wrapper around shared application state
    pub fn new(app: Rc<RefCell<App>>) -> Self {
        Self {
            window: None,
            renderer: Rc::new(RefCell::new(None)),
            app,
            modifiers: ModifiersState::empty(),
            cursor: [0.0, 0.0],
            error: None,
            #[cfg(not(target_arch = "wasm32"))]
            output: std::path::PathBuf::from("drawing"),
        }
    }

    /// Set the file stem used by Ctrl+S
    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_output(mut self, output: std::path::PathBuf) -> Self {
        self.output = output;
        self
    }

    /// The initialization error that stopped the event loop, if any
    pub fn take_error(&mut self) -> Option<CanvasError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: CanvasError) {
        log::error!("❌ {}", error);
        crate::debug::update_status(&format!("❌ {}", error));
        self.error = Some(error);
        event_loop.exit();
    }

    fn push_pointer(&mut self, event_type: PointerEventType, button: Option<PointerButton>) {
        let event = PointerEvent::new(event_type, self.cursor, button);
        self.app.borrow_mut().queue_input_event(event);
    }

    fn handle_shortcut(&mut self, shortcut: Shortcut) {
        log::debug!("Shortcut: {:?}", shortcut);
        let mut app = self.app.borrow_mut();
        match shortcut {
            Shortcut::Undo => app.undo(),
            Shortcut::Redo => app.redo(),
            Shortcut::Clear => app.clear(),
            Shortcut::BrushType(brush_type) => app.set_brush_type(brush_type),
            Shortcut::ToggleEraser => {
                let eraser = !app.brush().eraser;
                app.set_eraser(eraser);
            }
            Shortcut::ShrinkRadius => {
                let radius = app.brush().radius / RADIUS_STEP;
                app.set_brush_radius(radius);
            }
            Shortcut::GrowRadius => {
                let radius = app.brush().radius * RADIUS_STEP;
                app.set_brush_radius(radius);
            }
            Shortcut::ResetView => app.reset_view(),
            Shortcut::Save => {
                #[cfg(not(target_arch = "wasm32"))]
                if let Err(e) = save_drawing(&app, &self.output) {
                    log::error!("Save failed: {}", e);
                }
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn init_renderer(&mut self, _event_loop: &ActiveEventLoop, window: Arc<Window>, size: winit::dpi::PhysicalSize<u32>) {
        let config = self.app.borrow().config().clone();
        let renderer_slot = self.renderer.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match Renderer::new(window.clone(), size, &config).await {
                Ok(renderer) => {
                    *renderer_slot.borrow_mut() = Some(renderer);
                    log::info!("✅ Renderer initialized successfully");
                    // Request initial frame now that we're ready
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("❌ Renderer initialization failed: {}", e);
                    crate::debug::update_status(&format!("❌ {}", e));
                }
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn init_renderer(&mut self, event_loop: &ActiveEventLoop, window: Arc<Window>, size: winit::dpi::PhysicalSize<u32>) {
        let config = self.app.borrow().config().clone();
        match pollster::block_on(Renderer::new(window.clone(), size, &config)) {
            Ok(renderer) => {
                *self.renderer.borrow_mut() = Some(renderer);
                log::info!("✅ Renderer created");
                window.request_redraw();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }
}

impl ApplicationHandler for AppWrapper {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = {
            let app = self.app.borrow();
            (app.config().window_width, app.config().window_height)
        };
        let size = winit::dpi::PhysicalSize::new(width, height);
        let window_attributes = Window::default_attributes()
            .with_title("Stroke Canvas")
            .with_inner_size(size);

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, CanvasError::CreateSurface(e.to_string()));
                return;
            }
        };
        log::info!("Window created: {:?}", window.inner_size());

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowExtWebSys;

            let appended = window.canvas().and_then(|canvas| {
                let container = web_sys::window()?
                    .document()?
                    .get_element_by_id("canvas-container")?;
                container.append_child(&canvas).ok()
            });
            if appended.is_none() {
                self.fail(
                    event_loop,
                    CanvasError::CreateSurface("could not append canvas to #canvas-container".to_string()),
                );
                return;
            }
            // On web the size only applies once the canvas is in the DOM
            let _ = window.request_inner_size(size);
            log::info!("✅ Canvas appended to DOM and size requested: {:?}", size);
        }

        self.window = Some(window.clone());
        self.init_renderer(event_loop, window, size);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if physical_size.width == 0 || physical_size.height == 0 {
                    log::warn!("Ignoring resize to zero size: {:?}", physical_size);
                    return;
                }
                log::debug!("Resized: {:?}", physical_size);
                if let Some(renderer) = self.renderer.borrow_mut().as_mut() {
                    renderer.resize(physical_size);
                }
                self.app
                    .borrow_mut()
                    .resize(physical_size.width, physical_size.height);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = [position.x as f32, position.y as f32];
                self.push_pointer(PointerEventType::Move, None);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = pointer_button(button) else {
                    return;
                };
                let event_type = match state {
                    ElementState::Pressed => PointerEventType::Down,
                    ElementState::Released => PointerEventType::Up,
                };
                self.push_pointer(event_type, Some(button));
            }
            WindowEvent::CursorLeft { .. } | WindowEvent::Focused(false) => {
                self.push_pointer(PointerEventType::Cancel, None);
            }
            WindowEvent::Touch(touch) => {
                self.cursor = [touch.location.x as f32, touch.location.y as f32];
                let (event_type, button) = match touch.phase {
                    TouchPhase::Started => (PointerEventType::Down, Some(PointerButton::Primary)),
                    TouchPhase::Moved => (PointerEventType::Move, None),
                    TouchPhase::Ended => (PointerEventType::Up, Some(PointerButton::Primary)),
                    TouchPhase::Cancelled => (PointerEventType::Cancel, None),
                };
                self.push_pointer(event_type, button);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
                };
                self.app.borrow_mut().zoom(self.cursor, steps);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                if let Some(shortcut) = Shortcut::from_key(&event.logical_key, self.modifiers) {
                    self.handle_shortcut(shortcut);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(renderer) = self.renderer.borrow_mut().as_mut() {
                    self.app.borrow_mut().render(renderer);
                }
                // Continuous rendering; on web this maps to requestAnimationFrame
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Write `<stem>.json` and `<stem>.svg` for the current drawing
#[cfg(not(target_arch = "wasm32"))]
pub fn save_drawing(app: &App, stem: &std::path::Path) -> Result<(), CanvasError> {
    let preset_path = stem.with_extension("json");
    let svg_path = stem.with_extension("svg");
    std::fs::write(&preset_path, app.export_preset()?)?;
    std::fs::write(&svg_path, app.export_svg())?;
    log::info!("Saved {} and {}", preset_path.display(), svg_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str) -> Key {
        Key::Character(text.into())
    }

    #[test]
    fn test_undo_redo_shortcuts() {
        let ctrl = ModifiersState::CONTROL;
        let ctrl_shift = ModifiersState::CONTROL | ModifiersState::SHIFT;
        assert_eq!(Shortcut::from_key(&key("z"), ctrl), Some(Shortcut::Undo));
        assert_eq!(Shortcut::from_key(&key("Z"), ctrl_shift), Some(Shortcut::Redo));
        assert_eq!(Shortcut::from_key(&key("y"), ctrl), Some(Shortcut::Redo));
        assert_eq!(Shortcut::from_key(&key("z"), ModifiersState::SUPER), Some(Shortcut::Undo));
        assert_eq!(Shortcut::from_key(&key("z"), ModifiersState::empty()), None);
    }

    #[test]
    fn test_brush_shortcuts() {
        let none = ModifiersState::empty();
        assert_eq!(
            Shortcut::from_key(&key("3"), none),
            Some(Shortcut::BrushType(BrushType::Airbrush))
        );
        assert_eq!(Shortcut::from_key(&key("e"), none), Some(Shortcut::ToggleEraser));
        assert_eq!(Shortcut::from_key(&key("]"), none), Some(Shortcut::GrowRadius));
        assert_eq!(Shortcut::from_key(&key("0"), none), Some(Shortcut::ResetView));
        assert_eq!(
            Shortcut::from_key(&Key::Named(NamedKey::Delete), none),
            Some(Shortcut::Clear)
        );
        assert_eq!(Shortcut::from_key(&key("s"), ModifiersState::CONTROL), Some(Shortcut::Save));
        assert_eq!(Shortcut::from_key(&key("s"), none), None);
    }

    #[test]
    fn test_pointer_buttons() {
        assert_eq!(pointer_button(MouseButton::Left), Some(PointerButton::Primary));
        assert_eq!(pointer_button(MouseButton::Middle), Some(PointerButton::Middle));
        assert_eq!(pointer_button(MouseButton::Back), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_save_drawing_writes_both_files() {
        let dir = std::env::temp_dir().join(format!("stroke_canvas_save_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let stem = dir.join("drawing");

        let app = App::default();
        save_drawing(&app, &stem).unwrap();
        assert_eq!(std::fs::read_to_string(stem.with_extension("json")).unwrap(), "[]");
        assert!(std::fs::read_to_string(stem.with_extension("svg"))
            .unwrap()
            .starts_with("<svg"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
