//! Canvas Error Types
//!
//! Every fallible canvas operation reports one of these. Initialization errors
//! are fatal; the rest abort only the operation that raised them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    /// No GPU adapter compatible with the surface
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(String),

    #[error("failed to create surface: {0}")]
    CreateSurface(String),

    #[error("failed to create device: {0}")]
    RequestDevice(String),

    /// The segment buffer is full; the store was left unchanged
    #[error("segment capacity exceeded ({capacity} segments)")]
    CapacityExceeded { capacity: usize },

    /// Malformed preset file; the store was left unchanged
    #[error("invalid preset: {0}")]
    Preset(String),

    #[error("failed to load brush texture: {0}")]
    Texture(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CanvasError {
    fn from(value: serde_json::Error) -> Self {
        CanvasError::Preset(value.to_string())
    }
}

impl From<wgpu::RequestDeviceError> for CanvasError {
    fn from(value: wgpu::RequestDeviceError) -> Self {
        CanvasError::RequestDevice(value.to_string())
    }
}

impl From<wgpu::CreateSurfaceError> for CanvasError {
    fn from(value: wgpu::CreateSurfaceError) -> Self {
        CanvasError::CreateSurface(value.to_string())
    }
}

impl From<image::ImageError> for CanvasError {
    fn from(value: image::ImageError) -> Self {
        CanvasError::Texture(value.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<CanvasError> for wasm_bindgen::JsValue {
    fn from(value: CanvasError) -> Self {
        wasm_bindgen::JsValue::from_str(&value.to_string())
    }
}
