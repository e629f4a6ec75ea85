//! Loader errors.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

/// Failures that make a glTF document unloadable.
///
/// Problems confined to a single image or an unsupported extension are not
/// errors; they land in [`crate::LoadedDocument::warnings`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed GLB container: {0}")]
    Glb(&'static str),

    #[error("GLB version {0} not supported")]
    GlbVersion(u32),

    #[error("glTF version {0} not supported")]
    AssetVersion(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An object the renderer depends on has a value outside the glTF enums.
    #[error("{object}: {message}")]
    Invalid { object: String, message: String },

    #[error("buffer {0} has no uri and no GLB binary chunk")]
    MissingBufferData(usize),

    #[error("malformed data URI")]
    DataUri,

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Documents read from memory have no directory to resolve files against.
    #[error("cannot resolve external uri {0} without a base directory")]
    ExternalUri(String),
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(object: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            object: object.into(),
            message: message.into(),
        }
    }
}
