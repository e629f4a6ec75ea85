//! Device resources built once after load.

use std::ops::Range;

use prism_core::{
    generate_tangents, ComponentType, CoreError, Document, MagFilter, MinFilter, Primitive, NORMAL,
    POSITION, TANGENT, TEXCOORD_0,
};
use tracing::{debug, info, warn};

use crate::device::{
    BufferHandle, Device, SamplerDesc, TextureDesc, TextureHandle, VaoHandle, VertexArrayLayout,
    VertexAttribute, NORMAL_SLOT, POSITION_SLOT, TANGENT_SLOT, TEXCOORD_SLOT,
};
use crate::errors::RenderError;

/// Attribute semantics and the slots they feed.
const ATTRIBUTE_SLOTS: [(&str, u32); 4] = [
    (POSITION, POSITION_SLOT),
    (NORMAL, NORMAL_SLOT),
    (TEXCOORD_0, TEXCOORD_SLOT),
    (TANGENT, TANGENT_SLOT),
];

/// The vertex arrays of one mesh: `[begin, begin + count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaoRange {
    pub begin: usize,
    pub count: usize,
}

impl VaoRange {
    pub fn indices(&self) -> Range<usize> {
        self.begin..self.begin + self.count
    }
}

/// Everything uploaded for a document.
#[derive(Debug, Clone)]
pub struct GpuResources {
    /// One per document buffer, in order.
    pub buffers: Vec<BufferHandle>,
    /// One per primitive; `None` for primitives that could not be bound.
    pub vertex_arrays: Vec<Option<VaoHandle>>,
    /// One per mesh, in order.
    pub ranges: Vec<VaoRange>,
    /// One per document texture; `None` when its image is unavailable.
    pub textures: Vec<Option<TextureHandle>>,
    /// 1×1 white stand-in for absent textures.
    pub white_texture: TextureHandle,
}

impl GpuResources {
    pub fn build(device: &mut dyn Device, document: &Document) -> Result<Self, RenderError> {
        let buffers = build_buffers(device, document)?;
        let (vertex_arrays, ranges) = build_vertex_arrays(device, document, &buffers)?;
        let textures = build_textures(device, document)?;
        let white_texture = create_white_texture(device)?;

        info!(
            buffers = buffers.len(),
            vertex_arrays = vertex_arrays.iter().flatten().count(),
            skipped = vertex_arrays.iter().filter(|v| v.is_none()).count(),
            textures = textures.iter().flatten().count(),
            "uploaded scene resources"
        );

        Ok(Self {
            buffers,
            vertex_arrays,
            ranges,
            textures,
            white_texture,
        })
    }

    /// Vertex array of a mesh primitive, if it was built.
    pub fn vertex_array(&self, mesh: usize, primitive: usize) -> Option<VaoHandle> {
        let range = self.ranges.get(mesh)?;
        if primitive >= range.count {
            return None;
        }
        self.vertex_arrays.get(range.begin + primitive).copied().flatten()
    }

    /// Texture for a document texture reference, or the white stand-in.
    pub fn texture_or_white(&self, texture: Option<usize>) -> TextureHandle {
        texture
            .and_then(|t| self.textures.get(t).copied().flatten())
            .unwrap_or(self.white_texture)
    }
}

/// One device buffer per document buffer, holding its exact bytes.
pub fn build_buffers(device: &mut dyn Device, document: &Document) -> Result<Vec<BufferHandle>, RenderError> {
    document
        .buffers
        .iter()
        .map(|buffer| device.create_buffer(&buffer.data))
        .collect()
}

/// One vertex array per primitive, grouped per mesh.
///
/// Primitives with broken references are logged and left unbound so the
/// rest of the scene still draws; device failures are returned.
pub fn build_vertex_arrays(
    device: &mut dyn Device,
    document: &Document,
    buffers: &[BufferHandle],
) -> Result<(Vec<Option<VaoHandle>>, Vec<VaoRange>), RenderError> {
    let mut vertex_arrays = Vec::with_capacity(document.primitive_count());
    let mut ranges = Vec::with_capacity(document.meshes.len());

    for (mesh_index, mesh) in document.meshes.iter().enumerate() {
        ranges.push(VaoRange {
            begin: vertex_arrays.len(),
            count: mesh.primitives.len(),
        });

        for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
            let vao = match primitive_layout(device, document, buffers, primitive) {
                Ok(layout) => Some(device.create_vertex_array(&layout)?),
                Err(RenderError::Core(e)) => {
                    warn!(mesh = mesh_index, primitive = primitive_index, "skipping primitive: {}", e);
                    None
                }
                Err(e) => return Err(e),
            };
            vertex_arrays.push(vao);
        }
    }

    Ok((vertex_arrays, ranges))
}

fn primitive_layout(
    device: &mut dyn Device,
    document: &Document,
    buffers: &[BufferHandle],
    primitive: &Primitive,
) -> Result<VertexArrayLayout, RenderError> {
    if primitive.attribute(POSITION).is_none() {
        return Err(CoreError::MissingAttribute { semantic: POSITION }.into());
    }
    if let Some(material) = primitive.material {
        for texture in document.material(material)?.texture_slots().into_iter().flatten() {
            document.texture(texture)?;
        }
    }

    let mut layout = VertexArrayLayout::default();

    for (semantic, slot) in ATTRIBUTE_SLOTS {
        let Some(accessor) = primitive.attribute(semantic) else {
            continue;
        };
        let resolved = document.resolve_vertex_accessor(accessor)?;
        layout.attributes.push(VertexAttribute {
            slot,
            buffer: device_buffer(buffers, resolved.buffer)?,
            byte_offset: resolved.byte_offset,
            byte_stride: resolved.byte_stride,
            component_type: resolved.component_type,
            components: resolved.components,
            normalized: resolved.normalized,
            count: resolved.count,
        });
    }

    if let Some(indices) = primitive.indices {
        let resolved = document.resolve_index_accessor(indices)?;
        layout.index_buffer = Some(device_buffer(buffers, resolved.buffer)?);
    }

    if layout.attribute(TANGENT_SLOT).is_none() && wants_tangents(document, primitive) {
        if let Some(tangents) = generate_tangents(document, primitive)? {
            let raw: Vec<[f32; 4]> = tangents.iter().map(|t| t.to_array()).collect();
            let buffer = device.create_buffer(bytemuck::cast_slice(&raw))?;
            debug!(vertices = raw.len(), "generated tangents");
            layout.attributes.push(VertexAttribute {
                slot: TANGENT_SLOT,
                buffer,
                byte_offset: 0,
                byte_stride: 16,
                component_type: ComponentType::F32,
                components: 4,
                normalized: false,
                count: raw.len(),
            });
        }
    }

    Ok(layout)
}

/// Tangents are only needed to sample a normal map.
fn wants_tangents(document: &Document, primitive: &Primitive) -> bool {
    primitive
        .material
        .and_then(|m| document.materials.get(m))
        .is_some_and(|m| m.normal_texture.is_some())
}

fn device_buffer(buffers: &[BufferHandle], index: usize) -> Result<BufferHandle, CoreError> {
    buffers
        .get(index)
        .copied()
        .ok_or(CoreError::MissingBuffer { index })
}

/// One device texture per document texture.
///
/// Textures whose image is missing or failed to decode are `None`; the
/// renderer binds the white stand-in for them.
pub fn build_textures(
    device: &mut dyn Device,
    document: &Document,
) -> Result<Vec<Option<TextureHandle>>, RenderError> {
    let mut textures = Vec::with_capacity(document.textures.len());

    for (index, texture) in document.textures.iter().enumerate() {
        let image = texture
            .source
            .and_then(|s| document.images.get(s))
            .and_then(|image| image.data.as_ref());
        let Some(image) = image else {
            warn!(texture = index, "texture has no usable image");
            textures.push(None);
            continue;
        };

        let sampler = resolve_sampler(document, texture.sampler);
        let handle = device.create_texture(&TextureDesc {
            width: image.width,
            height: image.height,
            pixels: &image.pixels,
            sampler,
            generate_mipmaps: sampler.min_filter.uses_mipmaps(),
        })?;
        textures.push(Some(handle));
    }

    Ok(textures)
}

/// Sampler state for a texture; unset fields default to linear/repeat.
pub fn resolve_sampler(document: &Document, sampler: Option<usize>) -> SamplerDesc {
    let Some(sampler) = sampler.and_then(|s| document.samplers.get(s)) else {
        return SamplerDesc::default();
    };
    SamplerDesc {
        mag_filter: sampler.mag_filter.unwrap_or(MagFilter::Linear),
        min_filter: sampler.min_filter.unwrap_or(MinFilter::Linear),
        wrap_s: sampler.wrap_s,
        wrap_t: sampler.wrap_t,
    }
}

fn create_white_texture(device: &mut dyn Device) -> Result<TextureHandle, RenderError> {
    device.create_texture(&TextureDesc {
        width: 1,
        height: 1,
        pixels: &[255, 255, 255, 255],
        sampler: SamplerDesc::default(),
        generate_mipmaps: false,
    })
}
