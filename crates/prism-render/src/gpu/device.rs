//! Device implementation on top of wgpu.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;
use std::sync::Arc;

use glam::{Mat4, Vec4};
use image::imageops::FilterType;
use image::RgbaImage;
use prism_core::{AccessorView, ComponentType, MagFilter, MinFilter, PrimitiveMode, WrapMode};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use super::shaders::SHADER_SOURCE;
use crate::device::{
    BufferHandle, Device, DrawCall, FrameImage, ImageOrigin, SamplerDesc, TextureDesc, TextureHandle,
    UniformLocation, UniformValue, VaoHandle, VertexArrayLayout, Viewport,
};
use crate::errors::RenderError;

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Uniform names in location order.
const UNIFORMS: [&str; 15] = [
    "uModelMatrix",
    "uModelViewProjMatrix",
    "uModelViewMatrix",
    "uNormalMatrix",
    "uLightDirection",
    "uLightIntensity",
    "uNormalMapping",
    "uBaseColorTexture",
    "uBaseColorFactor",
    "uMetallicRoughnessTexture",
    "uMetallicFactor",
    "uRoughnessFactor",
    "uEmissiveTexture",
    "uEmissiveFactor",
    "uNormalTexture",
];

const TEXTURE_UNITS: usize = 4;
const VERTEX_SLOTS: usize = 4;

/// Values of disabled vertex slots: position, normal, texcoord, tangent.
const VERTEX_DEFAULTS: [[f32; 4]; VERTEX_SLOTS] = [
    [0.0, 0.0, 0.0, 1.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0, 1.0],
];

const VERTEX_ATTRIBUTES: [[wgpu::VertexAttribute; 1]; VERTEX_SLOTS] = [
    wgpu::vertex_attr_array![0 => Float32x4],
    wgpu::vertex_attr_array![1 => Float32x4],
    wgpu::vertex_attr_array![2 => Float32x4],
    wgpu::vertex_attr_array![3 => Float32x4],
];

/// Uniform block matching `Uniforms` in the shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    model: [[f32; 4]; 4],
    model_view_proj: [[f32; 4]; 4],
    model_view: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    light_direction: [f32; 4],
    light_intensity: [f32; 4],
    base_color_factor: [f32; 4],
    emissive_factor: [f32; 4],
    params: [f32; 4],
}

impl Default for Uniforms {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            model: identity,
            model_view_proj: identity,
            model_view: identity,
            normal_matrix: identity,
            light_direction: [0.0, 0.0, 1.0, 0.0],
            light_intensity: [1.0; 4],
            base_color_factor: [1.0; 4],
            emissive_factor: [0.0; 4],
            params: [1.0, 1.0, 0.0, 0.0],
        }
    }
}

impl Uniforms {
    fn set(&mut self, location: usize, value: UniformValue) {
        let matrix = |value: UniformValue| match value {
            UniformValue::Mat4(m) => Some(m.to_cols_array_2d()),
            _ => None,
        };
        let vector = |value: UniformValue| match value {
            UniformValue::Vec3(v) => Some(v.extend(0.0).to_array()),
            UniformValue::Vec4(v) => Some(v.to_array()),
            _ => None,
        };
        let scalar = |value: UniformValue| match value {
            UniformValue::Int(i) => Some(i as f32),
            UniformValue::Float(f) => Some(f),
            _ => None,
        };

        let applied = match location {
            0 => matrix(value).map(|m| self.model = m),
            1 => matrix(value).map(|m| self.model_view_proj = m),
            2 => matrix(value).map(|m| self.model_view = m),
            3 => matrix(value).map(|m| self.normal_matrix = m),
            4 => vector(value).map(|v| self.light_direction = v),
            5 => vector(value).map(|v| self.light_intensity = v),
            6 => scalar(value).map(|s| self.params[2] = s),
            8 => vector(value).map(|v| self.base_color_factor = v),
            10 => scalar(value).map(|s| self.params[0] = s),
            11 => scalar(value).map(|s| self.params[1] = s),
            13 => vector(value).map(|v| self.emissive_factor = v),
            // sampler units are fixed by the bind group layout
            _ => Some(()),
        };
        if applied.is_none() {
            debug!(uniform = UNIFORMS.get(location).copied(), ?value, "ignoring mistyped uniform");
        }
    }
}

struct GpuVertexArray {
    streams: Vec<wgpu::Buffer>,
    vertex_count: u32,
    index_buffer: Option<BufferHandle>,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// Index data widened to u32, keyed by where it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct IndexKey {
    buffer: BufferHandle,
    byte_offset: usize,
    index_type: ComponentType,
    count: usize,
}

struct PendingDraw {
    uniforms: Uniforms,
    textures: [TextureHandle; TEXTURE_UNITS],
    vao: VaoHandle,
    call: DrawCall,
}

struct Frame {
    viewport: Viewport,
    clear: wgpu::Color,
    draws: Vec<PendingDraw>,
}

enum Target {
    /// Owned texture that `read_pixels` copies back.
    Offscreen(Option<(wgpu::Texture, wgpu::TextureView)>),
    /// View handed in per frame, usually a swapchain image.
    External(Option<wgpu::TextureView>),
}

/// Find an adapter and open a device on it.
pub async fn create_device(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), RenderError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| RenderError::GpuInitFailed {
            reason: "Failed to find a suitable GPU adapter".to_string(),
        })?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Prism Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        )
        .await
        .map_err(|e| RenderError::GpuInitFailed {
            reason: format!("Failed to create device: {}", e),
        })?;

    debug!(adapter = ?adapter.get_info(), "opened wgpu device");
    Ok((adapter, device, queue))
}

/// wgpu implementation of [`Device`].
///
/// Buffers are kept on the host; vertex arrays expand every attribute into a
/// `vec4<f32>` stream so one pipeline layout serves all accessor formats.
/// Draws are recorded and replayed in a single render pass at `end_frame`.
pub struct WgpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    format: wgpu::TextureFormat,
    shader: wgpu::ShaderModule,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<wgpu::PrimitiveTopology, wgpu::RenderPipeline>,
    uniform_stride: u64,
    buffers: Vec<Vec<u8>>,
    vertex_arrays: Vec<GpuVertexArray>,
    index_buffers: HashMap<IndexKey, wgpu::Buffer>,
    textures: Vec<GpuTexture>,
    texture_bind_groups: HashMap<[TextureHandle; TEXTURE_UNITS], wgpu::BindGroup>,
    default_texture: TextureHandle,
    target: Target,
    depth: Option<(wgpu::Texture, wgpu::TextureView)>,
    current: Uniforms,
    bound_textures: [Option<TextureHandle>; TEXTURE_UNITS],
    bound_vao: Option<VaoHandle>,
    frame: Option<Frame>,
    last_size: Option<(u32, u32)>,
    warned_modes: HashSet<PrimitiveMode>,
}

impl WgpuDevice {
    /// Device rendering into an offscreen texture that can be read back.
    pub fn headless() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let (_adapter, device, queue) = pollster::block_on(create_device(&instance, None))?;
        Self::with_target(
            Arc::new(device),
            Arc::new(queue),
            OFFSCREEN_FORMAT,
            Target::Offscreen(None),
        )
    }

    /// Device drawing into views passed to [`WgpuDevice::set_target_view`].
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        Self::with_target(device, queue, format, Target::External(None))
    }

    fn with_target(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        format: wgpu::TextureFormat,
        target: Target,
    ) -> Result<Self, RenderError> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Prism Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SHADER_SOURCE)),
        });

        let uniform_size = std::mem::size_of::<Uniforms>() as u64;
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(uniform_size),
                },
                count: None,
            }],
        });

        let texture_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..TEXTURE_UNITS as u32)
            .flat_map(|unit| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: unit * 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: unit * 2 + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &texture_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = uniform_size.div_ceil(align) * align;

        let mut this = Self {
            device,
            queue,
            format,
            shader,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            uniform_stride,
            buffers: Vec::new(),
            vertex_arrays: Vec::new(),
            index_buffers: HashMap::new(),
            textures: Vec::new(),
            texture_bind_groups: HashMap::new(),
            default_texture: TextureHandle(0),
            target,
            depth: None,
            current: Uniforms::default(),
            bound_textures: [None; TEXTURE_UNITS],
            bound_vao: None,
            frame: None,
            last_size: None,
            warned_modes: HashSet::new(),
        };
        this.default_texture = this.create_texture(&TextureDesc {
            width: 1,
            height: 1,
            pixels: &[255; 4],
            sampler: SamplerDesc::default(),
            generate_mipmaps: false,
        })?;
        Ok(this)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// View the next frame draws into. Consumed by `end_frame`.
    pub fn set_target_view(&mut self, view: wgpu::TextureView) {
        if let Target::External(slot) = &mut self.target {
            *slot = Some(view);
        }
    }

    fn host_buffer(&self, handle: BufferHandle) -> Result<&[u8], RenderError> {
        self.buffers
            .get(handle.0 as usize)
            .map(Vec::as_slice)
            .ok_or(RenderError::InvalidHandle {
                kind: "buffer",
                id: handle.0,
            })
    }

    fn topology(&mut self, mode: PrimitiveMode) -> Option<wgpu::PrimitiveTopology> {
        let topology = match mode {
            PrimitiveMode::Points => wgpu::PrimitiveTopology::PointList,
            PrimitiveMode::Lines => wgpu::PrimitiveTopology::LineList,
            PrimitiveMode::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            PrimitiveMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
            PrimitiveMode::LineLoop | PrimitiveMode::TriangleFan => {
                if self.warned_modes.insert(mode) {
                    warn!(?mode, "topology not supported by wgpu, skipping draws");
                }
                return None;
            }
        };
        Some(topology)
    }

    fn ensure_pipeline(&mut self, topology: wgpu::PrimitiveTopology) {
        if self.pipelines.contains_key(&topology) {
            return;
        }
        let buffers: Vec<wgpu::VertexBufferLayout> = VERTEX_ATTRIBUTES
            .iter()
            .map(|attributes| wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Prism Render Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: topology.is_strip().then_some(wgpu::IndexFormat::Uint32),
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        self.pipelines.insert(topology, pipeline);
    }

    fn ensure_index_buffer(&mut self, vao: VaoHandle, call: &DrawCall) -> Result<Option<IndexKey>, RenderError> {
        let DrawCall::Elements {
            count,
            index_type,
            byte_offset,
            ..
        } = *call
        else {
            return Ok(None);
        };
        let buffer = self
            .vertex_arrays
            .get(vao.0 as usize)
            .and_then(|v| v.index_buffer)
            .ok_or_else(|| RenderError::GpuError {
                reason: "indexed draw without an index buffer".to_string(),
            })?;
        let key = IndexKey {
            buffer,
            byte_offset,
            index_type,
            count,
        };
        if !self.index_buffers.contains_key(&key) {
            let data = self.host_buffer(buffer)?.get(byte_offset..).unwrap_or(&[]);
            let view = AccessorView::from_bytes(data, index_type.size(), index_type, 1, false, count);
            let mut indices: Vec<u32> = (0..view.len()).map(|i| view.read_index(i)).collect();
            if indices.is_empty() {
                indices.push(0);
            }
            let gpu = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            self.index_buffers.insert(key, gpu);
        }
        Ok(Some(key))
    }

    fn ensure_texture_bind_group(&mut self, textures: [TextureHandle; TEXTURE_UNITS]) -> Result<(), RenderError> {
        if self.texture_bind_groups.contains_key(&textures) {
            return Ok(());
        }
        let mut resolved = Vec::with_capacity(TEXTURE_UNITS);
        for handle in textures {
            resolved.push(self.textures.get(handle.0 as usize).ok_or(RenderError::InvalidHandle {
                kind: "texture",
                id: handle.0,
            })?);
        }
        let entries: Vec<wgpu::BindGroupEntry> = resolved
            .iter()
            .enumerate()
            .flat_map(|(unit, texture)| {
                [
                    wgpu::BindGroupEntry {
                        binding: unit as u32 * 2,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: unit as u32 * 2 + 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ]
            })
            .collect();
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.texture_layout,
            entries: &entries,
        });
        self.texture_bind_groups.insert(textures, bind_group);
        Ok(())
    }

    fn ensure_targets(&mut self, width: u32, height: u32) {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let stale = |texture: &wgpu::Texture| texture.width() != width || texture.height() != height;

        if self.depth.as_ref().map_or(true, |(t, _)| stale(t)) {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Depth Buffer"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.depth = Some((texture, view));
        }

        if let Target::Offscreen(slot) = &mut self.target {
            if slot.as_ref().map_or(true, |(t, _)| stale(t)) {
                let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("Render Target"),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: OFFSCREEN_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                *slot = Some((texture, view));
            }
        }
    }

    /// Uniform block for every draw, each at a `uniform_stride` offset.
    fn upload_uniforms(&self, draws: &[PendingDraw]) -> wgpu::Buffer {
        let stride = self.uniform_stride as usize;
        let mut bytes = vec![0u8; stride * draws.len().max(1)];
        for (i, draw) in draws.iter().enumerate() {
            let block = bytemuck::bytes_of(&draw.uniforms);
            bytes[i * stride..i * stride + block.len()].copy_from_slice(block);
        }
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: &bytes,
            usage: wgpu::BufferUsages::UNIFORM,
        })
    }

    fn read_back(&self, texture: &wgpu::Texture) -> Result<Vec<u8>, RenderError> {
        let (width, height) = (texture.width(), texture.height());
        let bytes_per_row = width * 4;
        // Align to 256 bytes as required by wgpu
        let padded_bytes_per_row = (bytes_per_row + 255) & !255;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|_| RenderError::GpuError {
                reason: "Failed to receive buffer mapping result".to_string(),
            })?
            .map_err(|e| RenderError::GpuError {
                reason: format!("Failed to map buffer: {:?}", e),
            })?;

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((bytes_per_row * height) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            let end = start + bytes_per_row as usize;
            pixels.extend_from_slice(&data[start..end]);
        }

        drop(data);
        staging_buffer.unmap();

        Ok(pixels)
    }
}

fn address_mode(mode: WrapMode) -> wgpu::AddressMode {
    match mode {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
    }
}

fn filter_mode(filter: MagFilter) -> wgpu::FilterMode {
    match filter {
        MagFilter::Nearest => wgpu::FilterMode::Nearest,
        MagFilter::Linear => wgpu::FilterMode::Linear,
    }
}

/// Minification filter, mipmap filter and whether mip levels are sampled.
fn min_filter_modes(filter: MinFilter) -> (wgpu::FilterMode, wgpu::FilterMode, bool) {
    use wgpu::FilterMode::{Linear, Nearest};
    match filter {
        MinFilter::Nearest => (Nearest, Nearest, false),
        MinFilter::Linear => (Linear, Nearest, false),
        MinFilter::NearestMipmapNearest => (Nearest, Nearest, true),
        MinFilter::LinearMipmapNearest => (Linear, Nearest, true),
        MinFilter::NearestMipmapLinear => (Nearest, Linear, true),
        MinFilter::LinearMipmapLinear => (Linear, Linear, true),
    }
}

fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

fn clear_color(color: Vec4) -> wgpu::Color {
    wgpu::Color {
        r: color.x as f64,
        g: color.y as f64,
        b: color.z as f64,
        a: color.w as f64,
    }
}

impl Device for WgpuDevice {
    fn create_buffer(&mut self, data: &[u8]) -> Result<BufferHandle, RenderError> {
        self.buffers.push(data.to_vec());
        Ok(BufferHandle(self.buffers.len() as u32 - 1))
    }

    fn create_vertex_array(&mut self, layout: &VertexArrayLayout) -> Result<VaoHandle, RenderError> {
        for handle in layout.attributes.iter().map(|a| a.buffer).chain(layout.index_buffer) {
            self.host_buffer(handle)?;
        }
        let mut views = Vec::with_capacity(VERTEX_SLOTS);
        for slot in 0..VERTEX_SLOTS {
            let view = match layout.attribute(slot as u32) {
                Some(attribute) => {
                    let data = self.host_buffer(attribute.buffer)?.get(attribute.byte_offset..).unwrap_or(&[]);
                    Some(AccessorView::from_bytes(
                        data,
                        attribute.byte_stride,
                        attribute.component_type,
                        attribute.components,
                        attribute.normalized,
                        attribute.count,
                    ))
                }
                None => None,
            };
            views.push(view);
        }
        // counts are clamped to the bytes actually held, never the declared count
        let vertex_count = views.iter().flatten().map(|v| v.len()).max().unwrap_or(0);

        let mut streams = Vec::with_capacity(VERTEX_SLOTS);
        for (view, default) in views.iter().zip(VERTEX_DEFAULTS.iter()) {
            let mut stream = vec![*default; vertex_count.max(1)];
            if let Some(view) = view {
                let components = view.components().min(4);
                for (i, out) in stream.iter_mut().enumerate().take(view.len()) {
                    view.read_into(i, &mut out[..components]);
                }
            }
            streams.push(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Stream"),
                contents: bytemuck::cast_slice(&stream),
                usage: wgpu::BufferUsages::VERTEX,
            }));
        }

        self.vertex_arrays.push(GpuVertexArray {
            streams,
            vertex_count: vertex_count as u32,
            index_buffer: layout.index_buffer,
        });
        Ok(VaoHandle(self.vertex_arrays.len() as u32 - 1))
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureHandle, RenderError> {
        let expected = desc.width as usize * desc.height as usize * 4;
        let base = desc
            .pixels
            .get(..expected)
            .and_then(|pixels| RgbaImage::from_raw(desc.width, desc.height, pixels.to_vec()))
            .filter(|_| desc.width > 0 && desc.height > 0)
            .ok_or_else(|| RenderError::TextureFailed {
                reason: format!(
                    "{}x{} texture needs {} bytes, got {}",
                    desc.width,
                    desc.height,
                    expected,
                    desc.pixels.len()
                ),
            })?;

        let (min_filter, mipmap_filter, mipmapped) = min_filter_modes(desc.sampler.min_filter);
        let levels = if desc.generate_mipmaps && mipmapped {
            mip_level_count(desc.width, desc.height)
        } else {
            1
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Material Texture"),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for level in 0..levels {
            let width = (desc.width >> level).max(1);
            let height = (desc.height >> level).max(1);
            let resized;
            let pixels = if level == 0 {
                &base
            } else {
                resized = image::imageops::resize(&base, width, height, FilterType::Triangle);
                &resized
            };
            self.queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &texture,
                    mip_level: level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                pixels.as_raw(),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: address_mode(desc.sampler.wrap_s),
            address_mode_v: address_mode(desc.sampler.wrap_t),
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: filter_mode(desc.sampler.mag_filter),
            min_filter,
            mipmap_filter,
            lod_min_clamp: 0.0,
            lod_max_clamp: if mipmapped { 32.0 } else { 0.0 },
            ..Default::default()
        });

        self.textures.push(GpuTexture {
            _texture: texture,
            view,
            sampler,
        });
        Ok(TextureHandle(self.textures.len() as u32 - 1))
    }

    fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        UNIFORMS
            .iter()
            .position(|n| *n == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn begin_frame(&mut self, viewport: Viewport, clear: Vec4) -> Result<(), RenderError> {
        if viewport.width == 0 || viewport.height == 0 {
            return Err(RenderError::InvalidSize {
                width: viewport.width,
                height: viewport.height,
            });
        }
        self.frame = Some(Frame {
            viewport,
            clear: clear_color(clear),
            draws: Vec::new(),
        });
        Ok(())
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.current.set(location.0 as usize, value);
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
        let vao = self.bound_vao.ok_or_else(|| RenderError::GpuError {
            reason: "draw without a vertex array".to_string(),
        })?;
        if vao.0 as usize >= self.vertex_arrays.len() {
            return Err(RenderError::InvalidHandle {
                kind: "vertex array",
                id: vao.0,
            });
        }
        let mut uniforms = self.current;
        uniforms.params[3] = if self.format.is_srgb() { 0.0 } else { 1.0 };
        let textures = self.bound_textures.map(|t| t.unwrap_or(self.default_texture));

        let frame = self.frame.as_mut().ok_or_else(|| RenderError::GpuError {
            reason: "draw outside of a frame".to_string(),
        })?;
        frame.draws.push(PendingDraw {
            uniforms,
            textures,
            vao,
            call: *call,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        let Some(frame) = self.frame.take() else {
            return Err(RenderError::GpuError {
                reason: "end_frame without begin_frame".to_string(),
            });
        };
        let Viewport { width, height } = frame.viewport;
        self.ensure_targets(width, height);

        // Resolve everything the pass borrows before it starts.
        let mut draws = Vec::with_capacity(frame.draws.len());
        for (i, draw) in frame.draws.iter().enumerate() {
            let Some(topology) = self.topology(draw.call.mode()) else {
                continue;
            };
            self.ensure_pipeline(topology);
            self.ensure_texture_bind_group(draw.textures)?;
            let index_key = self.ensure_index_buffer(draw.vao, &draw.call)?;
            draws.push((i, topology, index_key));
        }
        let uniform_buffer = self.upload_uniforms(&frame.draws);
        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<Uniforms>() as u64),
                }),
            }],
        });

        let external_view;
        let color_view = match &mut self.target {
            Target::Offscreen(Some((_, view))) => &*view,
            Target::Offscreen(None) => {
                return Err(RenderError::GpuError {
                    reason: "offscreen target missing".to_string(),
                })
            }
            Target::External(slot) => {
                external_view = slot.take().ok_or_else(|| RenderError::GpuError {
                    reason: "no target view set for this frame".to_string(),
                })?;
                &external_view
            }
        };
        let Some((_, depth_view)) = &self.depth else {
            return Err(RenderError::GpuError {
                reason: "depth buffer missing".to_string(),
            });
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (i, topology, index_key) in draws {
                let draw = &frame.draws[i];
                let (Some(pipeline), Some(textures), Some(vao)) = (
                    self.pipelines.get(&topology),
                    self.texture_bind_groups.get(&draw.textures),
                    self.vertex_arrays.get(draw.vao.0 as usize),
                ) else {
                    continue;
                };

                render_pass.set_pipeline(pipeline);
                let offset = (i as u64 * self.uniform_stride) as u32;
                render_pass.set_bind_group(0, &uniform_bind_group, &[offset]);
                render_pass.set_bind_group(1, textures, &[]);
                for (slot, stream) in vao.streams.iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32, stream.slice(..));
                }

                let count = draw.call.count() as u32;
                match index_key.and_then(|key| self.index_buffers.get(&key)) {
                    Some(indices) => {
                        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..count, 0, 0..1);
                    }
                    None => render_pass.draw(0..count.min(vao.vertex_count), 0..1),
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.last_size = Some((width, height));
        Ok(())
    }

    fn read_pixels(&mut self) -> Result<FrameImage, RenderError> {
        let (width, height) = self.last_size.ok_or(RenderError::NoFrame)?;
        let Target::Offscreen(Some((texture, _))) = &self.target else {
            return Err(RenderError::GpuError {
                reason: "only offscreen targets can be read back".to_string(),
            });
        };
        let pixels = self.read_back(texture)?;
        Ok(FrameImage {
            width,
            height,
            pixels,
            origin: ImageOrigin::TopLeft,
        })
    }
}
