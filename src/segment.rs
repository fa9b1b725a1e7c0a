//! Segment Model
//!
//! A segment is one drawn capsule: two endpoints in world NDC, a radius and
//! the brush appearance captured at append time.

use crate::brush::{BrushConfig, BrushType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: [f32; 2],
    pub end: [f32; 2],
    /// sRGB, straight alpha
    pub color: [f32; 4],
    pub radius: f32,
    pub brush_type: BrushType,
    /// Path length from the gesture start to this segment's end
    pub cumulative_length: f32,
}

impl Segment {
    pub fn new(start: [f32; 2], end: [f32; 2], color: [f32; 4], radius: f32, brush_type: BrushType) -> Self {
        Self {
            start,
            end,
            color,
            radius,
            brush_type,
            cumulative_length: 0.0,
        }
    }

    /// A segment styled by the current brush
    pub fn with_brush(start: [f32; 2], end: [f32; 2], brush: &BrushConfig) -> Self {
        Self::new(start, end, brush.color, brush.radius, brush.effective_type())
    }

    pub fn length(&self) -> f32 {
        distance(self.start, self.end)
    }
}

#[inline]
pub fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt()
}

/// Per-instance vertex data for one segment
///
/// Must match `Segment` in `shaders/stroke.wgsl` and `shaders/arc_length.wgsl`.
#[repr(C, align(16))] // Force 16-byte alignment; the compute pass reads this as a storage array
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SegmentInstance {
    pub start: [f32; 2],
    pub end: [f32; 2],
    pub color: [f32; 4],
    pub radius: f32,
    pub brush_type: u32,
    pub _padding: [u32; 2],
}

impl SegmentInstance {
    pub const STRIDE: wgpu::BufferAddress = std::mem::size_of::<SegmentInstance>() as wgpu::BufferAddress;

    /// Build the instance, converting the color with `convert` (identity for sRGB blending)
    pub fn from_segment(segment: &Segment, convert: impl Fn([f32; 4]) -> [f32; 4]) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
            color: convert(segment.color),
            radius: segment.radius,
            brush_type: segment.brush_type.as_u32(),
            _padding: [0; 2],
        }
    }

    /// Byte offset of slot `index` in the segment buffer
    pub fn offset_of(index: usize) -> wgpu::BufferAddress {
        index as wgpu::BufferAddress * Self::STRIDE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<SegmentInstance>(), 48);
        assert_eq!(SegmentInstance::offset_of(3), 144);
    }

    #[test]
    fn test_with_brush_uses_effective_type() {
        let mut brush = BrushConfig::default();
        brush.eraser = true;
        let segment = Segment::with_brush([0.0, 0.0], [0.3, 0.4], &brush);
        assert_eq!(segment.brush_type, BrushType::Eraser);
        assert!((segment.length() - 0.5).abs() < 1e-6);
    }
}
