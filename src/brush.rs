//! Brush Types and Configuration
//!
//! This module defines the brush settings that UI controls write and the
//! input tracker reads whenever it appends a segment.

use serde::{Deserialize, Serialize};

use crate::error::CanvasError;

/// How a segment is shaded
///
/// The discriminant is both the preset `strokeType` value and the
/// `brush_type` field the stroke shader branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum BrushType {
    /// Solid capsule
    #[default]
    Vanilla = 0,
    /// Brush texture stamped at even arc-length intervals
    Stamp = 1,
    /// Soft radial falloff, accumulated along the stroke
    Airbrush = 2,
    /// Paints the paper color back over the canvas
    Eraser = 3,
}

impl BrushType {
    pub const ALL: [BrushType; 4] = [
        BrushType::Vanilla,
        BrushType::Stamp,
        BrushType::Airbrush,
        BrushType::Eraser,
    ];

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for BrushType {
    type Error = CanvasError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| CanvasError::Preset(format!("unknown stroke type {}", value)))
    }
}

/// Brush settings set by UI controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    /// Brush color in sRGB, straight alpha (0.0-1.0)
    pub color: [f32; 4],
    /// Capsule radius in NDC-height units
    pub radius: f32,
    /// Selected brush
    pub brush_type: BrushType,
    /// When set, overrides `brush_type` with `Eraser`
    pub eraser: bool,
}

impl BrushConfig {
    /// Create a brush configuration with the eraser toggle off
    pub fn new(color: [f32; 4], radius: f32, brush_type: BrushType) -> Self {
        Self {
            color,
            radius,
            brush_type,
            eraser: false,
        }
    }

    /// The brush type new segments actually get
    pub fn effective_type(&self) -> BrushType {
        if self.eraser {
            BrushType::Eraser
        } else {
            self.brush_type
        }
    }

    /// Validate that parameters are in acceptable ranges
    pub fn validate(&self) -> Result<(), CanvasError> {
        if !(self.radius > 0.0) || !self.radius.is_finite() {
            return Err(CanvasError::InvalidConfig(
                "brush radius must be positive".to_string(),
            ));
        }
        if self.color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(CanvasError::InvalidConfig(
                "brush color components must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            color: [0.1, 0.1, 0.1, 1.0],
            radius: 0.01,
            brush_type: BrushType::Vanilla,
            eraser: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brush_type_from_u32() {
        for brush_type in BrushType::ALL {
            assert_eq!(BrushType::try_from(brush_type.as_u32()).unwrap(), brush_type);
        }
        assert!(matches!(BrushType::try_from(4), Err(CanvasError::Preset(_))));
    }

    #[test]
    fn test_eraser_toggle_overrides_type() {
        let mut brush = BrushConfig::new([1.0, 0.0, 0.0, 1.0], 0.02, BrushType::Airbrush);
        assert_eq!(brush.effective_type(), BrushType::Airbrush);

        brush.eraser = true;
        assert_eq!(brush.effective_type(), BrushType::Eraser);
    }

    #[test]
    fn test_validate() {
        assert!(BrushConfig::default().validate().is_ok());

        let zero_radius = BrushConfig { radius: 0.0, ..Default::default() };
        assert!(zero_radius.validate().is_err());

        let nan_radius = BrushConfig { radius: f32::NAN, ..Default::default() };
        assert!(nan_radius.validate().is_err());

        let bad_color = BrushConfig { color: [1.5, 0.0, 0.0, 1.0], ..Default::default() };
        assert!(bad_color.validate().is_err());
    }
}
