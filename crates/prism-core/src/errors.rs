//! Error types for the scene model.

use thiserror::Error;

/// Structural errors found while following index references in a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("accessor {index} does not exist")]
    MissingAccessor { index: usize },

    #[error("buffer view {index} does not exist")]
    MissingBufferView { index: usize },

    #[error("buffer {index} does not exist")]
    MissingBuffer { index: usize },

    #[error("material {index} does not exist")]
    MissingMaterial { index: usize },

    #[error("texture {index} does not exist")]
    MissingTexture { index: usize },

    #[error("mesh {index} does not exist")]
    MissingMesh { index: usize },

    #[error("buffer view {view} is bound as {found} data where {expected} data was expected")]
    TargetMismatch {
        view: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("primitive has no {semantic} attribute")]
    MissingAttribute { semantic: &'static str },

    #[error("accessor {accessor} reads past the end of buffer {buffer}")]
    OutOfBounds { accessor: usize, buffer: usize },

    #[error("accessor {accessor} has an unsupported layout: {reason}")]
    UnsupportedLayout { accessor: usize, reason: String },
}
