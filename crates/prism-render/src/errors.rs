//! Error types for rendering.

use prism_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("GPU initialization failed: {reason}")]
    GpuInitFailed { reason: String },

    #[error("GPU error: {reason}")]
    GpuError { reason: String },

    #[error("Texture creation failed: {reason}")]
    TextureFailed { reason: String },

    #[error("Unknown {kind} handle {id}")]
    InvalidHandle { kind: &'static str, id: u32 },

    #[error("Invalid frame size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("No frame has been rendered")]
    NoFrame,

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
