//! CPU rasterizer with a depth buffer.
//!
//! Implements [`Device`] without a GPU so scenes can be rendered headless.
//! It shades with the base color and emissive inputs under a Lambert light,
//! draws triangle topologies only, and stores rows bottom-up like a GL
//! framebuffer.

use glam::{Mat4, Vec2, Vec3, Vec4};
use prism_core::{AccessorView, MagFilter, PrimitiveMode, WrapMode};
use tracing::warn;

use crate::device::{
    BufferHandle, Device, DrawCall, FrameImage, ImageOrigin, SamplerDesc, TextureDesc, TextureHandle,
    UniformLocation, UniformValue, VaoHandle, VertexArrayLayout, VertexAttribute, Viewport,
    NORMAL_SLOT, POSITION_SLOT, TEXCOORD_SLOT,
};
use crate::errors::RenderError;
use crate::material::{BASE_COLOR_UNIT, EMISSIVE_UNIT};

/// Uniforms this device's program exposes, indexed by location.
const UNIFORMS: [&str; 9] = [
    "uModelViewProjMatrix",
    "uModelViewMatrix",
    "uNormalMatrix",
    "uLightDirection",
    "uLightIntensity",
    "uBaseColorTexture",
    "uBaseColorFactor",
    "uEmissiveTexture",
    "uEmissiveFactor",
];

const MVP: usize = 0;
const NORMAL_MATRIX: usize = 2;
const LIGHT_DIRECTION: usize = 3;
const LIGHT_INTENSITY: usize = 4;
const BASE_COLOR_FACTOR: usize = 6;
const EMISSIVE_FACTOR: usize = 8;

const AMBIENT: f32 = 0.03;

/// Largest frame side the rasterizer allocates for.
pub const MAX_FRAME_DIMENSION: u32 = 16384;

/// Pixel count of a frame, or `None` when either side is zero or too large.
fn frame_pixels(width: u32, height: u32) -> Option<usize> {
    if width == 0 || height == 0 || width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
        return None;
    }
    (width as usize).checked_mul(height as usize)
}

struct SoftwareTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    sampler: SamplerDesc,
}

impl SoftwareTexture {
    fn texel(&self, x: i64, y: i64) -> Vec4 {
        let x = wrap(x, self.width, self.sampler.wrap_s);
        let y = wrap(y, self.height, self.sampler.wrap_t);
        let i = (y * self.width as usize + x) * 4;
        let p = &self.pixels[i..i + 4];
        Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0
    }

    fn sample(&self, uv: Vec2) -> Vec4 {
        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;
        match self.sampler.mag_filter {
            MagFilter::Nearest => self.texel(x.round() as i64, y.round() as i64),
            MagFilter::Linear => {
                let (x0, y0) = (x.floor(), y.floor());
                let (fx, fy) = (x - x0, y - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);
                let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), fx);
                let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), fx);
                top.lerp(bottom, fy)
            }
        }
    }
}

fn wrap(coord: i64, size: u32, mode: WrapMode) -> usize {
    let size = size as i64;
    let wrapped = match mode {
        WrapMode::ClampToEdge => coord.clamp(0, size - 1),
        WrapMode::Repeat => coord.rem_euclid(size),
        WrapMode::MirroredRepeat => {
            let period = coord.rem_euclid(2 * size);
            if period < size {
                period
            } else {
                2 * size - 1 - period
            }
        }
    };
    wrapped as usize
}

/// Vertex after the vertex stage.
#[derive(Clone, Copy)]
struct ShadedVertex {
    screen: Vec3,
    normal: Vec3,
    uv: Vec2,
}

/// Software implementation of [`Device`].
pub struct SoftwareDevice {
    width: u32,
    height: u32,
    color_buffer: Vec<u8>,
    depth_buffer: Vec<f32>,
    buffers: Vec<Vec<u8>>,
    vertex_arrays: Vec<VertexArrayLayout>,
    textures: Vec<SoftwareTexture>,
    uniforms: [Option<UniformValue>; UNIFORMS.len()],
    bound_textures: [Option<TextureHandle>; 4],
    bound_vao: Option<VaoHandle>,
    in_frame: bool,
    frame_ready: bool,
    warned_unsupported: bool,
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            color_buffer: Vec::new(),
            depth_buffer: Vec::new(),
            buffers: Vec::new(),
            vertex_arrays: Vec::new(),
            textures: Vec::new(),
            uniforms: [None; UNIFORMS.len()],
            bound_textures: [None; 4],
            bound_vao: None,
            in_frame: false,
            frame_ready: false,
            warned_unsupported: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth_buffer(&self) -> &[f32] {
        &self.depth_buffer
    }

    fn resize(&mut self, width: u32, height: u32, pixels: usize) -> Result<(), RenderError> {
        let color_len = pixels
            .checked_mul(4)
            .ok_or(RenderError::InvalidSize { width, height })?;
        self.width = width;
        self.height = height;
        self.color_buffer = vec![0; color_len];
        self.depth_buffer = vec![f32::INFINITY; pixels];
        Ok(())
    }

    fn clear(&mut self, color: Vec4) {
        let rgba = color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
        let rgba = [rgba.x as u8, rgba.y as u8, rgba.z as u8, rgba.w as u8];
        for chunk in self.color_buffer.chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
        self.depth_buffer.fill(f32::INFINITY);
    }

    fn matrix(&self, slot: usize) -> Mat4 {
        match self.uniforms[slot] {
            Some(UniformValue::Mat4(m)) => m,
            _ => Mat4::IDENTITY,
        }
    }

    fn vec3(&self, slot: usize, default: Vec3) -> Vec3 {
        match self.uniforms[slot] {
            Some(UniformValue::Vec3(v)) => v,
            Some(UniformValue::Vec4(v)) => v.truncate(),
            _ => default,
        }
    }

    fn vec4(&self, slot: usize, default: Vec4) -> Vec4 {
        match self.uniforms[slot] {
            Some(UniformValue::Vec4(v)) => v,
            _ => default,
        }
    }

    fn bound_texture(&self, unit: u32) -> Option<&SoftwareTexture> {
        let handle = self.bound_textures.get(unit as usize).copied().flatten()?;
        self.textures.get(handle.0 as usize)
    }

    fn attribute_view(&self, attribute: &VertexAttribute) -> Result<AccessorView<'_>, RenderError> {
        let buffer = self
            .buffers
            .get(attribute.buffer.0 as usize)
            .ok_or(RenderError::InvalidHandle {
                kind: "buffer",
                id: attribute.buffer.0,
            })?;
        let data = buffer.get(attribute.byte_offset..).unwrap_or(&[]);
        Ok(AccessorView::from_bytes(
            data,
            attribute.byte_stride,
            attribute.component_type,
            attribute.components,
            attribute.normalized,
            attribute.count,
        ))
    }

    fn vertex_indices(&self, layout: &VertexArrayLayout, call: &DrawCall) -> Result<Vec<u32>, RenderError> {
        match *call {
            DrawCall::Arrays { count, .. } => Ok((0..count as u32).collect()),
            DrawCall::Elements {
                count,
                index_type,
                byte_offset,
                ..
            } => {
                let handle = layout.index_buffer.ok_or_else(|| RenderError::GpuError {
                    reason: "indexed draw without an index buffer".to_string(),
                })?;
                let buffer = self
                    .buffers
                    .get(handle.0 as usize)
                    .ok_or(RenderError::InvalidHandle { kind: "buffer", id: handle.0 })?;
                let data = buffer.get(byte_offset..).unwrap_or(&[]);
                let view = AccessorView::from_bytes(data, index_type.size(), index_type, 1, false, count);
                Ok((0..view.len()).map(|i| view.read_index(i)).collect())
            }
        }
    }

    /// Vertex stage: positions to screen space, normals to view space.
    fn shade_vertices(&self, layout: &VertexArrayLayout) -> Result<Vec<Option<ShadedVertex>>, RenderError> {
        let Some(position) = layout.attribute(POSITION_SLOT) else {
            return Ok(Vec::new());
        };
        let positions = self.attribute_view(position)?;
        let normals = layout.attribute(NORMAL_SLOT).map(|a| self.attribute_view(a)).transpose()?;
        let uvs = layout.attribute(TEXCOORD_SLOT).map(|a| self.attribute_view(a)).transpose()?;

        let mvp = self.matrix(MVP);
        let normal_matrix = self.matrix(NORMAL_MATRIX);

        Ok((0..positions.len())
            .map(|i| {
                let clip = mvp * positions.read_vec3(i).extend(1.0);
                // no clipping; vertices behind the eye drop their triangle
                if clip.w <= 0.0 {
                    return None;
                }
                let ndc = clip.truncate() / clip.w;
                let normal = normals
                    .as_ref()
                    .filter(|n| i < n.len())
                    .map(|n| normal_matrix.transform_vector3(n.read_vec3(i)).normalize_or_zero())
                    .unwrap_or(Vec3::Z);
                let uv = uvs
                    .as_ref()
                    .filter(|t| i < t.len())
                    .map(|t| t.read_vec2(i))
                    .unwrap_or(Vec2::ZERO);
                Some(ShadedVertex {
                    screen: self.ndc_to_screen(ndc),
                    normal,
                    uv,
                })
            })
            .collect())
    }

    /// Row 0 is the bottom of the image.
    fn ndc_to_screen(&self, ndc: Vec3) -> Vec3 {
        Vec3::new(
            (ndc.x + 1.0) * 0.5 * self.width as f32,
            (ndc.y + 1.0) * 0.5 * self.height as f32,
            ndc.z,
        )
    }

    fn rasterize_triangle(&mut self, v: [ShadedVertex; 3], material: &FragmentInputs) {
        let [s0, s1, s2] = [v[0].screen, v[1].screen, v[2].screen];

        let min_x = s0.x.min(s1.x).min(s2.x).max(0.0) as i32;
        let max_x = s0.x.max(s1.x).max(s2.x).min(self.width as f32 - 1.0) as i32;
        let min_y = s0.y.min(s1.y).min(s2.y).max(0.0) as i32;
        let max_y = s0.y.max(s1.y).max(s2.y).min(self.height as f32 - 1.0) as i32;

        let area = edge_function(s0, s1, s2);
        if area.abs() < 0.0001 {
            return;
        }
        let inv_area = 1.0 / area;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
                let w0 = edge_function(s1, s2, p);
                let w1 = edge_function(s2, s0, p);
                let w2 = edge_function(s0, s1, p);

                let inside = (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0) || (w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0);
                if !inside {
                    continue;
                }
                let (b0, b1, b2) = (w0 * inv_area, w1 * inv_area, w2 * inv_area);

                let depth = s0.z * b0 + s1.z * b1 + s2.z * b2;
                if !(0.0..=1.0).contains(&depth) {
                    continue;
                }
                let idx = y as usize * self.width as usize + x as usize;
                if depth >= self.depth_buffer[idx] {
                    continue;
                }
                self.depth_buffer[idx] = depth;

                let normal = (v[0].normal * b0 + v[1].normal * b1 + v[2].normal * b2).normalize_or_zero();
                let uv = v[0].uv * b0 + v[1].uv * b1 + v[2].uv * b2;
                let color = self.shade_fragment(normal, uv, material);

                let pixel = idx * 4;
                self.color_buffer[pixel] = (color.x * 255.0) as u8;
                self.color_buffer[pixel + 1] = (color.y * 255.0) as u8;
                self.color_buffer[pixel + 2] = (color.z * 255.0) as u8;
                self.color_buffer[pixel + 3] = 255;
            }
        }
    }

    /// Lambert diffuse plus emissive, gamma encoded.
    fn shade_fragment(&self, normal: Vec3, uv: Vec2, inputs: &FragmentInputs) -> Vec3 {
        let base = self
            .bound_texture(BASE_COLOR_UNIT)
            .map(|t| srgb_to_linear(t.sample(uv)))
            .unwrap_or(Vec4::ONE)
            * inputs.base_color;
        let emissive = self
            .bound_texture(EMISSIVE_UNIT)
            .map(|t| srgb_to_linear(t.sample(uv)).truncate())
            .unwrap_or(Vec3::ONE)
            * inputs.emissive;

        let n_dot_l = normal.dot(inputs.light_direction).abs();
        let diffuse = base.truncate() / std::f32::consts::PI * inputs.light_intensity * n_dot_l;
        let color = diffuse + base.truncate() * AMBIENT + emissive;
        gamma_correct(color.clamp(Vec3::ZERO, Vec3::ONE))
    }
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform inputs constant across one draw call.
struct FragmentInputs {
    base_color: Vec4,
    emissive: Vec3,
    light_direction: Vec3,
    light_intensity: Vec3,
}

#[inline]
fn edge_function(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

fn srgb_to_linear(c: Vec4) -> Vec4 {
    Vec4::new(c.x.powf(2.2), c.y.powf(2.2), c.z.powf(2.2), c.w)
}

fn gamma_correct(c: Vec3) -> Vec3 {
    Vec3::new(c.x.powf(1.0 / 2.2), c.y.powf(1.0 / 2.2), c.z.powf(1.0 / 2.2))
}

/// Vertex triples for a triangle topology.
fn assemble_triangles(mode: PrimitiveMode, indices: &[u32]) -> Vec<[u32; 3]> {
    match mode {
        PrimitiveMode::Triangles => indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect(),
        PrimitiveMode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, t)| if i % 2 == 0 { [t[0], t[1], t[2]] } else { [t[1], t[0], t[2]] })
            .collect(),
        PrimitiveMode::TriangleFan => indices
            .get(1..)
            .unwrap_or(&[])
            .windows(2)
            .map(|t| [indices[0], t[0], t[1]])
            .collect(),
        _ => Vec::new(),
    }
}

impl Device for SoftwareDevice {
    fn create_buffer(&mut self, data: &[u8]) -> Result<BufferHandle, RenderError> {
        self.buffers.push(data.to_vec());
        Ok(BufferHandle(self.buffers.len() as u32 - 1))
    }

    fn create_vertex_array(&mut self, layout: &VertexArrayLayout) -> Result<VaoHandle, RenderError> {
        let buffers = layout
            .attributes
            .iter()
            .map(|a| a.buffer)
            .chain(layout.index_buffer);
        for handle in buffers {
            if handle.0 as usize >= self.buffers.len() {
                return Err(RenderError::InvalidHandle {
                    kind: "buffer",
                    id: handle.0,
                });
            }
        }
        self.vertex_arrays.push(layout.clone());
        Ok(VaoHandle(self.vertex_arrays.len() as u32 - 1))
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureHandle, RenderError> {
        let expected = desc.width as usize * desc.height as usize * 4;
        if desc.width == 0 || desc.height == 0 || desc.pixels.len() < expected {
            return Err(RenderError::TextureFailed {
                reason: format!(
                    "{}x{} texture needs {} bytes, got {}",
                    desc.width,
                    desc.height,
                    expected,
                    desc.pixels.len()
                ),
            });
        }
        self.textures.push(SoftwareTexture {
            width: desc.width,
            height: desc.height,
            pixels: desc.pixels[..expected].to_vec(),
            sampler: desc.sampler,
        });
        Ok(TextureHandle(self.textures.len() as u32 - 1))
    }

    fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        UNIFORMS
            .iter()
            .position(|n| *n == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn begin_frame(&mut self, viewport: Viewport, clear_color: Vec4) -> Result<(), RenderError> {
        let pixels = frame_pixels(viewport.width, viewport.height).ok_or(RenderError::InvalidSize {
            width: viewport.width,
            height: viewport.height,
        })?;
        if viewport.width != self.width || viewport.height != self.height {
            self.resize(viewport.width, viewport.height, pixels)?;
        }
        self.clear(clear_color);
        self.in_frame = true;
        self.frame_ready = false;
        Ok(())
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if let Some(slot) = self.uniforms.get_mut(location.0 as usize) {
            *slot = Some(value);
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        if let Some(slot) = self.bound_textures.get_mut(unit as usize) {
            *slot = Some(texture);
        }
    }

    fn bind_vertex_array(&mut self, vao: VaoHandle) {
        self.bound_vao = Some(vao);
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::GpuError {
                reason: "draw outside of a frame".to_string(),
            });
        }
        if !call.mode().is_triangles() {
            if !self.warned_unsupported {
                warn!(mode = ?call.mode(), "software device only draws triangles, skipping");
                self.warned_unsupported = true;
            }
            return Ok(());
        }

        let vao = self.bound_vao.ok_or_else(|| RenderError::GpuError {
            reason: "draw without a vertex array".to_string(),
        })?;
        let layout = self
            .vertex_arrays
            .get(vao.0 as usize)
            .cloned()
            .ok_or(RenderError::InvalidHandle {
                kind: "vertex array",
                id: vao.0,
            })?;

        let vertices = self.shade_vertices(&layout)?;
        let indices = self.vertex_indices(&layout, call)?;
        let inputs = FragmentInputs {
            base_color: self.vec4(BASE_COLOR_FACTOR, Vec4::ONE),
            emissive: self.vec3(EMISSIVE_FACTOR, Vec3::ZERO),
            light_direction: self.vec3(LIGHT_DIRECTION, Vec3::Z).normalize_or_zero(),
            light_intensity: self.vec3(LIGHT_INTENSITY, Vec3::ONE),
        };

        for [a, b, c] in assemble_triangles(call.mode(), &indices) {
            let fetch = |i: u32| vertices.get(i as usize).copied().flatten();
            if let (Some(a), Some(b), Some(c)) = (fetch(a), fetch(b), fetch(c)) {
                self.rasterize_triangle([a, b, c], &inputs);
            }
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.in_frame = false;
        self.frame_ready = true;
        Ok(())
    }

    fn read_pixels(&mut self) -> Result<FrameImage, RenderError> {
        if !self.frame_ready {
            return Err(RenderError::NoFrame);
        }
        Ok(FrameImage {
            width: self.width,
            height: self.height,
            pixels: self.color_buffer.clone(),
            origin: ImageOrigin::BottomLeft,
        })
    }
}
