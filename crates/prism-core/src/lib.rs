//! Core types for the Prism glTF viewer.
//!
//! This crate provides:
//! - The in-memory scene model (index-addressed tables of nodes, meshes,
//!   accessors, buffers, materials, textures)
//! - Accessor decoding through the accessor / buffer view / buffer chain
//! - Local and world transform resolution over the node hierarchy
//! - Axis-aligned bounds of the rendered geometry
//! - Tangent generation for normal mapping

pub mod accessor;
pub mod errors;
pub mod geometry;
pub mod scene;
pub mod tangent;
pub mod transform;

pub use accessor::{AccessorView, ResolvedAccessor};
pub use errors::CoreError;
pub use geometry::BoundingBox;
pub use scene::*;
pub use tangent::generate_tangents;
pub use transform::{local_matrix, local_to_world, scene_bounds, traverse};
