//! glTF 2.0 loading for the Prism viewer.
//!
//! Reads `.gltf` (JSON with data URIs or external files) and `.glb`
//! containers into a [`prism_core::Document`]. Images are decoded to RGBA8
//! up front so the renderer never touches encoded data.

pub mod error;
pub mod gltf;

pub use error::{LoadError, Result};
pub use gltf::{load, GltfReader, LoadedDocument};
