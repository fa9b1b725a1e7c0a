//! Brush Stamp Textures
//!
//! The stamp brush samples the alpha channel of this texture. A procedural
//! round stamp is used until a PNG is loaded.

use crate::error::CanvasError;

/// RGBA8 pixels of a brush stamp
#[derive(Debug, Clone, PartialEq)]
pub struct BrushTexture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl BrushTexture {
    /// Default texture edge length in pixels
    pub const DEFAULT_SIZE: u32 = 128;

    /// A soft round stamp with a slightly grainy interior
    pub fn procedural(size: u32) -> Self {
        let size = size.max(2);
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        let center = (size as f32 - 1.0) * 0.5;
        for y in 0..size {
            for x in 0..size {
                let dx = (x as f32 - center) / center;
                let dy = (y as f32 - center) / center;
                let d = (dx * dx + dy * dy).sqrt();
                let falloff = (1.0 - d).clamp(0.0, 1.0).powf(0.6);
                // Cheap hash noise so overlapping stamps read as texture
                let grain = ((x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)) % 64) as f32 / 255.0;
                let alpha = (falloff * (1.0 - grain)).clamp(0.0, 1.0);
                rgba.extend_from_slice(&[255, 255, 255, (alpha * 255.0).round() as u8]);
            }
        }
        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    /// Decode a PNG stamp
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, CanvasError> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?.to_rgba8();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(CanvasError::Texture("empty image".to_string()));
        }
        log::info!("Brush texture decoded: {}x{}", width, height);
        Ok(Self {
            width,
            height,
            rgba: image.into_raw(),
        })
    }

    /// Reject stamps the device cannot hold in one 2D texture
    pub fn check_size(&self, max_dimension: u32) -> Result<(), CanvasError> {
        if self.width > max_dimension || self.height > max_dimension {
            return Err(CanvasError::Texture(format!(
                "{}x{} exceeds max texture dimension {}",
                self.width, self.height, max_dimension
            )));
        }
        Ok(())
    }
}

impl Default for BrushTexture {
    fn default() -> Self {
        Self::procedural(Self::DEFAULT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_at(texture: &BrushTexture, x: u32, y: u32) -> u8 {
        texture.rgba[((y * texture.width + x) * 4 + 3) as usize]
    }

    #[test]
    fn test_procedural_stamp_is_round() {
        let texture = BrushTexture::procedural(64);
        assert_eq!(texture.rgba.len(), 64 * 64 * 4);
        assert!(alpha_at(&texture, 32, 32) > 150);
        assert_eq!(alpha_at(&texture, 0, 0), 0);
        assert_eq!(alpha_at(&texture, 63, 63), 0);
    }

    #[test]
    fn test_decode_png() {
        let mut source = image::RgbaImage::new(3, 2);
        source.put_pixel(1, 1, image::Rgba([10, 20, 30, 200]));
        let mut bytes = Vec::new();
        source
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let texture = BrushTexture::from_png_bytes(&bytes).unwrap();
        assert_eq!((texture.width, texture.height), (3, 2));
        assert_eq!(alpha_at(&texture, 1, 1), 200);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = BrushTexture::from_png_bytes(b"definitely not a png");
        assert!(matches!(result, Err(CanvasError::Texture(_))));
    }

    #[test]
    fn test_oversized_stamp_is_rejected() {
        let texture = BrushTexture {
            width: 4096,
            height: 16,
            rgba: Vec::new(),
        };
        assert!(texture.check_size(8192).is_ok());
        assert!(texture.check_size(4096).is_ok());
        let err = texture.check_size(2048).unwrap_err();
        assert!(matches!(err, CanvasError::Texture(_)));
        assert!(err.to_string().contains("4096x16"));
    }
}
