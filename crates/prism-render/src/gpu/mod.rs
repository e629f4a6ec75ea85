//! Hardware rendering through wgpu.
//!
//! [`WgpuDevice`] implements the same [`Device`](crate::Device) trait as the
//! software rasterizer, running the metallic-roughness shader on the GPU. It
//! renders either into an offscreen texture for readback or into views
//! supplied by a window surface.

pub mod device;
pub mod shaders;

pub use device::{create_device, WgpuDevice};
