//! Pan/Zoom View
//!
//! An affine map from world NDC (where segments live) to screen NDC:
//! `screen = world * scale + offset`.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub offset: [f32; 2],
    pub scale: f32,
}

impl View {
    pub fn world_to_screen(&self, world: [f32; 2]) -> [f32; 2] {
        [
            world[0] * self.scale + self.offset[0],
            world[1] * self.scale + self.offset[1],
        ]
    }

    pub fn screen_to_world(&self, screen: [f32; 2]) -> [f32; 2] {
        [
            (screen[0] - self.offset[0]) / self.scale,
            (screen[1] - self.offset[1]) / self.scale,
        ]
    }

    /// Translate by a screen-space NDC delta
    pub fn pan(&mut self, delta: [f32; 2]) {
        self.offset[0] += delta[0];
        self.offset[1] += delta[1];
    }

    /// Zoom by `steps` wheel lines, keeping the world point under `anchor` fixed
    pub fn zoom_at(&mut self, anchor: [f32; 2], steps: f32, intensity: f32, min: f32, max: f32) {
        let world = self.screen_to_world(anchor);
        self.scale = (self.scale * (1.0 + steps * intensity)).clamp(min, max);
        self.offset = [
            anchor[0] - world[0] * self.scale,
            anchor[1] - world[1] * self.scale,
        ];
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for View {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            scale: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_view() {
        let view = View::default();
        assert_eq!(view.screen_to_world([0.25, -0.5]), [0.25, -0.5]);
    }

    #[test]
    fn test_round_trip_after_pan() {
        let mut view = View::default();
        view.pan([0.2, -0.1]);
        let world = view.screen_to_world([0.5, 0.5]);
        let screen = view.world_to_screen(world);
        assert!((screen[0] - 0.5).abs() < 1e-6);
        assert!((screen[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut view = View::default();
        let anchor = [0.3, 0.4];
        let before = view.screen_to_world(anchor);
        view.zoom_at(anchor, 3.0, 0.1, 0.1, 20.0);
        assert!((view.scale - 1.3).abs() < 1e-6);
        let after = view.screen_to_world(anchor);
        assert!((before[0] - after[0]).abs() < 1e-5);
        assert!((before[1] - after[1]).abs() < 1e-5);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut view = View::default();
        view.zoom_at([0.0, 0.0], -50.0, 0.1, 0.1, 20.0);
        assert_eq!(view.scale, 0.1);
    }
}
