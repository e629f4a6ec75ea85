//! Rendering for the Prism glTF viewer.
//!
//! This crate provides:
//! - The [`Device`] abstraction over a single-program graphics backend
//! - GPU resource building from a loaded document
//! - Material binding and per-frame scene traversal
//! - A software rasterizer with a depth buffer
//! - A wgpu backend (feature `gpu`)
//! - Offline rendering to PNG

mod device;
mod errors;
mod frame;
mod material;
mod offline;
mod resources;
mod settings;
mod software;

#[cfg(feature = "gpu")]
pub mod gpu;

#[cfg(test)]
mod testing;

pub use device::{
    BufferHandle, Device, DrawCall, FrameImage, ImageOrigin, SamplerDesc, TextureDesc, TextureHandle,
    UniformLocation, UniformValue, VaoHandle, VertexArrayLayout, VertexAttribute, Viewport, NORMAL_SLOT,
    POSITION_SLOT, TANGENT_SLOT, TEXCOORD_SLOT,
};
pub use errors::RenderError;
pub use frame::{draw_call, FrameRenderer, FrameStats, FrameUniforms};
pub use material::{
    bind_material, MaterialUniforms, BASE_COLOR_UNIT, EMISSIVE_UNIT, METALLIC_ROUGHNESS_UNIT, NORMAL_UNIT,
};
pub use offline::{render_image, render_to_png, OfflineFrame};
pub use resources::{GpuResources, VaoRange};
pub use settings::{scene_size, Projection, RenderSettings, FALLBACK_SCENE_SIZE};
pub use software::SoftwareDevice;

#[cfg(feature = "gpu")]
pub use gpu::WgpuDevice;
