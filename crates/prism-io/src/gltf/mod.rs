//! glTF 2.0 format support.

mod reader;
mod schema;

pub use reader::{load, GltfReader, LoadedDocument};
