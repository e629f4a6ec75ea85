//! Error types for cameras.

use thiserror::Error;

/// Errors building a camera.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    #[error("degenerate camera: {reason}")]
    Degenerate { reason: &'static str },

    #[error("invalid look-at '{input}': {reason}")]
    InvalidLookAt { input: String, reason: String },
}
