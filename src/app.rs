//! Application State and Logic
//!
//! This module contains the core application state and update/render logic.
//! It's designed to be independent of the windowing system, making it easier
//! to port to different platforms (native, web).

use crate::brush::{BrushConfig, BrushType};
use crate::brush_texture::BrushTexture;
use crate::config::CanvasConfig;
use crate::debug;
use crate::error::CanvasError;
use crate::input::{InputQueue, InputTracker, PointerEvent, TrackerContext, TrackerState};
use crate::preset;
use crate::renderer::{BlendColorSpace, Renderer};
use crate::store::StrokeStore;
use crate::svg::{self, SvgOptions};
use crate::view::View;

/// Main application state
pub struct App {
    config: CanvasConfig,
    input_queue: InputQueue,
    tracker: InputTracker,
    store: StrokeStore,
    brush: BrushConfig,
    view: View,
    /// Canvas size in pixels
    viewport: [f32; 2],
    blend_color_space: BlendColorSpace,
    /// Decoded stamp waiting for the renderer
    pending_brush_texture: Option<BrushTexture>,
}

impl App {
    /// Create a new application from a validated config
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            input_queue: InputQueue::new(),
            tracker: InputTracker::new(config.track_step),
            store: StrokeStore::new(config.max_segments, config.undo_step),
            brush: config.brush,
            view: View::default(),
            viewport: [config.window_width as f32, config.window_height as f32],
            blend_color_space: config.blend_color_space,
            pending_brush_texture: None,
            config,
        }
    }

    /// Render the application (called each frame)
    pub fn render(&mut self, renderer: &mut Renderer) {
        self.process_input_events();

        if let Some(texture) = self.pending_brush_texture.take() {
            if let Err(e) = renderer.set_brush_texture(&texture) {
                log::error!("Brush texture rejected: {}", e);
            }
        }
        if renderer.blend_color_space() != self.blend_color_space {
            renderer.set_blend_color_space(self.blend_color_space);
            // Instance colors depend on the color space
            self.store.invalidate();
        }

        renderer.render(&mut self.store, &self.view);
        debug::update_segments(self.store.instance_count(), self.store.capacity());
    }

    /// Drain queued pointer events through the tracker
    pub fn process_input_events(&mut self) {
        let mut ctx = TrackerContext {
            store: &mut self.store,
            view: &mut self.view,
            brush: &self.brush,
            viewport: self.viewport,
        };
        let mut processed = 0;
        for event in self.input_queue.drain_events() {
            self.tracker.handle_event(&event, &mut ctx);
            processed += 1;
        }

        if processed > 0 {
            log::debug!(
                "Processed {} input events, {} segments visible",
                processed,
                self.store.instance_count()
            );
            if let Some(position) = self.input_queue.last_position() {
                let state = match self.tracker.state() {
                    TrackerState::Idle => "idle",
                    TrackerState::Drawing { .. } => "drawing",
                    TrackerState::Panning { .. } => "panning",
                };
                debug::update_pointer(position[0], position[1], state);
            }
        }
    }

    /// Queue an input event for processing
    pub fn queue_input_event(&mut self, event: PointerEvent) {
        self.input_queue.push_event(event);
    }

    /// Check if there are pending input events
    pub fn has_pending_input(&self) -> bool {
        self.input_queue.has_events()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.viewport = [width as f32, height as f32];
        }
    }

    pub fn brush(&self) -> &BrushConfig {
        &self.brush
    }

    /// Set the brush color; while drawing, the gesture's newest segment follows it
    pub fn set_brush_color(&mut self, color: [f32; 4]) {
        self.brush.color = color;
        if self.tracker.is_drawing() {
            self.store.set_brush_color(color);
        }
    }

    /// Set the brush radius; while drawing, the gesture's newest segment follows it
    pub fn set_brush_radius(&mut self, radius: f32) {
        if !(radius > 0.0) || !radius.is_finite() {
            log::warn!("Ignoring invalid brush radius {}", radius);
            return;
        }
        self.brush.radius = radius;
        if self.tracker.is_drawing() {
            self.store.set_brush_radius(radius);
        }
    }

    pub fn set_brush_type(&mut self, brush_type: BrushType) {
        self.brush.brush_type = brush_type;
        self.sync_live_brush_type();
    }

    pub fn set_eraser(&mut self, eraser: bool) {
        self.brush.eraser = eraser;
        self.sync_live_brush_type();
    }

    fn sync_live_brush_type(&mut self) {
        if self.tracker.is_drawing() {
            self.store.set_brush_type(self.brush.effective_type());
        }
    }

    pub fn undo(&mut self) {
        self.store.undo();
    }

    pub fn redo(&mut self) {
        self.store.redo();
    }

    /// Clear the canvas
    pub fn clear(&mut self) {
        self.tracker.reset();
        self.store.clear();
    }

    /// Zoom the view around a pixel position by `steps` wheel lines
    pub fn zoom(&mut self, pixel: [f32; 2], steps: f32) {
        let anchor = crate::input::pixel_to_ndc(pixel, self.viewport);
        self.view.zoom_at(
            anchor,
            steps,
            self.config.zoom_intensity,
            self.config.min_zoom,
            self.config.max_zoom,
        );
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    /// Visible segments as preset JSON
    pub fn export_preset(&self) -> Result<String, CanvasError> {
        preset::export_store(&self.store)
    }

    /// Replace the drawing with a preset; on failure the drawing is kept
    pub fn import_preset(&mut self, json: &str) -> Result<usize, CanvasError> {
        match preset::import_store(&mut self.store, json) {
            Ok(count) => {
                self.tracker.reset();
                Ok(count)
            }
            Err(e) => {
                log::error!("Preset import failed: {}", e);
                Err(e)
            }
        }
    }

    /// Visible segments as an SVG document sized to the canvas
    pub fn export_svg(&self) -> String {
        let options = SvgOptions {
            width: self.viewport[0] as u32,
            height: self.viewport[1] as u32,
            radius_scale: self.config.svg_radius_scale,
            paper_color: self.config.paper_color.map(|c| c as f32),
        };
        svg::export_svg(self.store.visible_segments(), &options)
    }

    /// Decode a PNG stamp and hand it to the renderer on the next frame
    pub fn load_brush_texture(&mut self, png: &[u8]) -> Result<(), CanvasError> {
        match BrushTexture::from_png_bytes(png) {
            Ok(texture) => {
                self.pending_brush_texture = Some(texture);
                Ok(())
            }
            Err(e) => {
                log::error!("Brush texture load failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn set_blend_color_space(&mut self, color_space: BlendColorSpace) {
        self.blend_color_space = color_space;
    }

    pub fn store(&self) -> &StrokeStore {
        &self.store
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}
