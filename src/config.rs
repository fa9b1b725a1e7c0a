//! Canvas Configuration
//!
//! Tunables for the stroke store, the input tracker and the exporters. All
//! fields have defaults, so a config file only needs the keys it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::brush::BrushConfig;
use crate::error::CanvasError;
use crate::renderer::BlendColorSpace;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Capacity of the segment instance buffer
    pub max_segments: usize,
    /// Segments removed (or restored) by one undo (redo)
    pub undo_step: usize,
    /// Minimum pointer travel in NDC before a new segment is appended
    pub track_step: f32,
    /// Paper color in sRGB; also what the eraser paints
    pub paper_color: [f64; 4],
    /// Pixels per radius unit in SVG export
    pub svg_radius_scale: f32,
    /// Zoom change per wheel line
    pub zoom_intensity: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub window_width: u32,
    pub window_height: u32,
    pub blend_color_space: BlendColorSpace,
    /// Initial brush
    pub brush: BrushConfig,
}

impl CanvasConfig {
    /// Load a config overlay from a JSON file and validate it
    pub fn from_json_file(path: &Path) -> Result<Self, CanvasError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, CanvasError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| CanvasError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CanvasError> {
        if self.max_segments == 0 {
            return Err(CanvasError::InvalidConfig(
                "max_segments must be at least 1".to_string(),
            ));
        }
        if self.undo_step == 0 {
            return Err(CanvasError::InvalidConfig(
                "undo_step must be at least 1".to_string(),
            ));
        }
        if !(self.track_step > 0.0) {
            return Err(CanvasError::InvalidConfig(
                "track_step must be positive".to_string(),
            ));
        }
        if !(self.svg_radius_scale > 0.0) {
            return Err(CanvasError::InvalidConfig(
                "svg_radius_scale must be positive".to_string(),
            ));
        }
        if !(self.min_zoom > 0.0) || self.min_zoom > self.max_zoom {
            return Err(CanvasError::InvalidConfig(
                "zoom range must satisfy 0 < min_zoom <= max_zoom".to_string(),
            ));
        }
        if self.paper_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(CanvasError::InvalidConfig(
                "paper color components must be between 0.0 and 1.0".to_string(),
            ));
        }
        self.brush.validate()
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            max_segments: 10_000,
            undo_step: 10,
            track_step: 0.01,
            // Warm off-white paper, #F4F3EF
            paper_color: [0.957, 0.953, 0.937, 1.0],
            svg_radius_scale: 300.0,
            zoom_intensity: 0.1,
            min_zoom: 0.1,
            max_zoom: 20.0,
            window_width: 800,
            window_height: 600,
            blend_color_space: BlendColorSpace::Srgb,
            brush: BrushConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CanvasConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_segments, 10_000);
        assert_eq!(config.undo_step, 10);
    }

    #[test]
    fn test_partial_json_overlay() {
        let config = CanvasConfig::from_json_str(r#"{ "undo_step": 1, "track_step": 0.05 }"#).unwrap();
        assert_eq!(config.undo_step, 1);
        assert!((config.track_step - 0.05).abs() < 1e-6);
        assert_eq!(config.max_segments, 10_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(CanvasConfig::from_json_str(r#"{ "max_segments": 0 }"#).is_err());
        assert!(CanvasConfig::from_json_str(r#"{ "track_step": -1.0 }"#).is_err());
        assert!(CanvasConfig::from_json_str(r#"{ "min_zoom": 5.0, "max_zoom": 1.0 }"#).is_err());
        assert!(CanvasConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_blend_color_space_and_brush_keys() {
        let config = CanvasConfig::from_json_str(
            r#"{ "blend_color_space": "linear", "brush": { "radius": 0.03 } }"#,
        )
        .unwrap();
        assert_eq!(config.blend_color_space, BlendColorSpace::Linear);
        assert!((config.brush.radius - 0.03).abs() < 1e-6);
        assert_eq!(config.brush.color, BrushConfig::default().color);
    }
}
