//! Color Space Conversion Utilities
//!
//! Color workflow:
//! - Brush and paper colors are authored in sRGB (pickers, presets)
//! - The accumulation canvas is Rgba16Float; in linear blend mode instance
//!   colors are converted to linear before upload
//! - Surface uses an sRGB format, wgpu handles the final linear → sRGB encode

use crate::error::CanvasError;

/// Convert a single sRGB color component to linear space
///
/// Formula from: https://en.wikipedia.org/wiki/SRGB#From_sRGB_to_CIE_XYZ
#[inline]
pub fn srgb_to_linear(srgb: f32) -> f32 {
    if srgb <= 0.04045 {
        srgb / 12.92
    } else {
        ((srgb + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert sRGB color [r, g, b, a] to linear; alpha is already linear
#[inline]
pub fn srgb_to_linear_rgba(srgb: [f32; 4]) -> [f32; 4] {
    [
        srgb_to_linear(srgb[0]),
        srgb_to_linear(srgb[1]),
        srgb_to_linear(srgb[2]),
        srgb[3],
    ]
}

/// f64 variant for clear colors
#[inline]
pub fn srgb_to_linear_rgba_f64(srgb: [f64; 4]) -> [f64; 4] {
    [
        srgb_to_linear(srgb[0] as f32) as f64,
        srgb_to_linear(srgb[1] as f32) as f64,
        srgb_to_linear(srgb[2] as f32) as f64,
        srgb[3],
    ]
}

/// Parse a CSS color string (`#rrggbb`, `rgb(...)`, named colors) into sRGB RGBA
///
/// Color pickers on the web hand us hex strings, so this is the entry point
/// for `CanvasHandle::set_brush_color_css`.
pub fn parse_css_color(text: &str) -> Result<[f32; 4], CanvasError> {
    let color = csscolorparser::parse(text)
        .map_err(|e| CanvasError::InvalidConfig(format!("bad color {:?}: {}", text, e)))?;
    Ok([color.r, color.g, color.b, color.a])
}

/// Format the RGB part of an sRGB color as `rgb(r,g,b)` for SVG fills
pub fn to_svg_rgb(color: [f32; 4]) -> String {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgb({},{},{})",
        channel(color[0]),
        channel(color[1]),
        channel(color[2])
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_to_linear() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 0.001);

        // Middle gray: sRGB 0.5 ≈ linear 0.214
        let linear = srgb_to_linear(0.5);
        assert!((linear - 0.214).abs() < 0.01);
    }

    #[test]
    fn test_alpha_is_untouched() {
        let linear = srgb_to_linear_rgba([0.5, 0.5, 0.5, 0.3]);
        assert_eq!(linear[3], 0.3);

        let linear = srgb_to_linear_rgba_f64([0.957, 0.953, 0.937, 1.0]);
        assert_eq!(linear[3], 1.0);
        assert!(linear[0] > 0.9 && linear[0] <= 1.0);
    }

    #[test]
    fn test_parse_css_color() {
        let red = parse_css_color("#ff0000").unwrap();
        assert!((red[0] - 1.0).abs() < 1e-6);
        assert!(red[1].abs() < 1e-6);
        assert!((red[3] - 1.0).abs() < 1e-6);

        assert!(parse_css_color("not a color").is_err());
    }

    #[test]
    fn test_to_svg_rgb() {
        assert_eq!(to_svg_rgb([1.0, 0.0, 0.5, 1.0]), "rgb(255,0,128)");
        assert_eq!(to_svg_rgb([2.0, -1.0, 0.0, 1.0]), "rgb(255,0,0)");
    }
}
