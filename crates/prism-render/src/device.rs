//! Device abstraction between the renderer and a graphics backend.
//!
//! The renderer speaks to a [`Device`] the way a GL program would: it uploads
//! buffers and textures once, describes vertex-array bindings, looks uniforms
//! up by name, and issues draw calls. Uniforms a backend does not expose come
//! back as `None` and are skipped by the caller.

use glam::{Mat4, Vec3, Vec4};
use prism_core::{ComponentType, MagFilter, MinFilter, PrimitiveMode, WrapMode};

use crate::errors::RenderError;

/// Vertex attribute slot fed by POSITION.
pub const POSITION_SLOT: u32 = 0;
/// Vertex attribute slot fed by NORMAL.
pub const NORMAL_SLOT: u32 = 1;
/// Vertex attribute slot fed by TEXCOORD_0.
pub const TEXCOORD_SLOT: u32 = 2;
/// Vertex attribute slot fed by TANGENT or generated tangents.
pub const TANGENT_SLOT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VaoHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Where one vertex attribute slot reads from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexAttribute {
    pub slot: u32,
    pub buffer: BufferHandle,
    /// Absolute offset of the first element in the buffer.
    pub byte_offset: usize,
    /// Never zero; tightly packed attributes carry their element size.
    pub byte_stride: usize,
    pub component_type: ComponentType,
    pub components: usize,
    pub normalized: bool,
    /// Elements available from `byte_offset`.
    pub count: usize,
}

/// Bindings recorded by one vertex array object.
///
/// Slots without an attribute are disabled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexArrayLayout {
    pub attributes: Vec<VertexAttribute>,
    pub index_buffer: Option<BufferHandle>,
}

impl VertexArrayLayout {
    pub fn attribute(&self, slot: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.slot == slot)
    }
}

/// Fully resolved sampler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerDesc {
    pub mag_filter: MagFilter,
    pub min_filter: MinFilter,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: MagFilter::Linear,
            min_filter: MinFilter::Linear,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
        }
    }
}

/// A 2D RGBA8 texture upload.
#[derive(Debug, Clone, Copy)]
pub struct TextureDesc<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
    pub sampler: SamplerDesc,
    pub generate_mipmaps: bool,
}

/// Opaque uniform slot returned by [`Device::uniform_location`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

/// A draw call against the bound vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    /// Non-indexed draw of `count` vertices starting at vertex 0.
    Arrays { mode: PrimitiveMode, count: usize },
    /// Indexed draw reading `count` indices from the bound index buffer.
    Elements {
        mode: PrimitiveMode,
        count: usize,
        index_type: ComponentType,
        byte_offset: usize,
    },
}

impl DrawCall {
    pub fn mode(&self) -> PrimitiveMode {
        match self {
            DrawCall::Arrays { mode, .. } | DrawCall::Elements { mode, .. } => *mode,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            DrawCall::Arrays { count, .. } | DrawCall::Elements { count, .. } => *count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height; 1 for an empty viewport.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Row order of pixels read back from a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    TopLeft,
    BottomLeft,
}

/// RGBA8 pixels of the last rendered frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub origin: ImageOrigin,
}

impl FrameImage {
    /// Rows reordered so row 0 is the top of the image.
    pub fn into_top_down(mut self) -> Self {
        if self.origin == ImageOrigin::BottomLeft {
            let row = self.width as usize * 4;
            if row > 0 {
                let flipped: Vec<u8> = self.pixels.chunks_exact(row).rev().flatten().copied().collect();
                self.pixels = flipped;
            }
            self.origin = ImageOrigin::TopLeft;
        }
        self
    }

    /// RGBA at `(x, y)` counted from the top-left corner.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = match self.origin {
            ImageOrigin::TopLeft => y,
            ImageOrigin::BottomLeft => self.height - 1 - y,
        };
        let i = (row as usize * self.width as usize + x as usize) * 4;
        let p = self.pixels.get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }
}

/// A graphics backend with a single shader program bound.
pub trait Device {
    /// Upload an immutable buffer.
    fn create_buffer(&mut self, data: &[u8]) -> Result<BufferHandle, RenderError>;

    fn create_vertex_array(&mut self, layout: &VertexArrayLayout) -> Result<VaoHandle, RenderError>;

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureHandle, RenderError>;

    /// Location of a named uniform, or `None` when the program lacks it.
    fn uniform_location(&self, name: &str) -> Option<UniformLocation>;

    /// Start a frame, clearing color and depth.
    fn begin_frame(&mut self, viewport: Viewport, clear_color: Vec4) -> Result<(), RenderError>;

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    fn bind_vertex_array(&mut self, vao: VaoHandle);

    /// Draw with the current uniforms, textures and vertex array.
    ///
    /// Topologies the backend cannot draw are skipped, not errors.
    fn draw(&mut self, call: &DrawCall) -> Result<(), RenderError>;

    fn end_frame(&mut self) -> Result<(), RenderError>;

    /// Pixels of the last finished frame.
    fn read_pixels(&mut self) -> Result<FrameImage, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_bottom_left_image() {
        let image = FrameImage {
            width: 1,
            height: 2,
            pixels: vec![1, 1, 1, 1, 2, 2, 2, 2],
            origin: ImageOrigin::BottomLeft,
        };
        assert_eq!(image.pixel(0, 0), Some([2, 2, 2, 2]));

        let top_down = image.into_top_down();
        assert_eq!(top_down.origin, ImageOrigin::TopLeft);
        assert_eq!(top_down.pixels, vec![2, 2, 2, 2, 1, 1, 1, 1]);
        assert_eq!(top_down.pixel(0, 0), Some([2, 2, 2, 2]));
    }

    #[test]
    fn test_viewport_aspect() {
        assert_eq!(Viewport::new(1280, 720).aspect(), 1280.0 / 720.0);
        assert_eq!(Viewport::new(10, 0).aspect(), 1.0);
    }

    #[test]
    fn test_layout_lookup() {
        let attribute = VertexAttribute {
            slot: NORMAL_SLOT,
            buffer: BufferHandle(0),
            byte_offset: 0,
            byte_stride: 12,
            component_type: ComponentType::F32,
            components: 3,
            normalized: false,
            count: 3,
        };
        let layout = VertexArrayLayout {
            attributes: vec![attribute],
            index_buffer: None,
        };
        assert_eq!(layout.attribute(NORMAL_SLOT), Some(&attribute));
        assert!(layout.attribute(POSITION_SLOT).is_none());
    }
}
