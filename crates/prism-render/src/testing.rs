//! Recording device and small documents for renderer tests.

use std::collections::HashMap;

use glam::{Vec3, Vec4};
use prism_core::{
    Accessor, Buffer, BufferTarget, BufferView, ComponentType, Dimensions, Document, Mesh, Node,
    NodeTransform, Primitive, Scene, POSITION, TEXCOORD_0,
};

use crate::device::{
    BufferHandle, Device, DrawCall, FrameImage, ImageOrigin, SamplerDesc, TextureDesc, TextureHandle,
    UniformLocation, UniformValue, VaoHandle, VertexArrayLayout, Viewport,
};
use crate::errors::RenderError;

/// Every uniform name the renderer queries.
pub(crate) const ALL_UNIFORMS: [&str; 15] = [
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

#[derive(Debug, Clone)]
pub(crate) struct RecordedTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub sampler: SamplerDesc,
    pub generate_mipmaps: bool,
}

/// State captured at each draw call.
#[derive(Debug, Clone)]
pub(crate) struct RecordedDraw {
    pub vao: VaoHandle,
    pub call: DrawCall,
    pub uniforms: HashMap<String, UniformValue>,
    pub textures: HashMap<u32, TextureHandle>,
}

impl RecordedDraw {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

/// A device that records every call instead of drawing.
#[derive(Debug, Default)]
pub(crate) struct RecordingDevice {
    names: Vec<String>,
    pub buffers: Vec<Vec<u8>>,
    pub vertex_arrays: Vec<VertexArrayLayout>,
    pub textures: Vec<RecordedTexture>,
    pub uniform_uploads: Vec<(String, UniformValue)>,
    current: HashMap<String, UniformValue>,
    pub bound_textures: HashMap<u32, TextureHandle>,
    pub bound_vao: Option<VaoHandle>,
    pub draws: Vec<RecordedDraw>,
    pub frames: Vec<Viewport>,
}

impl RecordingDevice {
    /// Exposes every uniform the renderer uses.
    pub fn new() -> Self {
        Self::with_uniforms(&ALL_UNIFORMS)
    }

    /// Exposes only `names`.
    pub fn with_uniforms(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Latest value uploaded to a uniform.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.current.get(name).copied()
    }
}

impl Device for RecordingDevice {
    fn create_buffer(&mut self, data: &[u8]) -> Result<BufferHandle, RenderError> {
        self.buffers.push(data.to_vec());
        Ok(BufferHandle(self.buffers.len() as u32 - 1))
    }

    fn create_vertex_array(&mut self, layout: &VertexArrayLayout) -> Result<VaoHandle, RenderError> {
        self.vertex_arrays.push(layout.clone());
        Ok(VaoHandle(self.vertex_arrays.len() as u32 - 1))
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureHandle, RenderError> {
        self.textures.push(RecordedTexture {
            width: desc.width,
            height: desc.height,
            pixels: desc.pixels.to_vec(),
            sampler: desc.sampler,
            generate_mipmaps: desc.generate_mipmaps,
        });
        Ok(TextureHandle(self.textures.len() as u32 - 1))
    }

    fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn begin_frame(&mut self, viewport: Viewport, _clear_color: Vec4) -> Result<(), RenderError> {
        self.frames.push(viewport);
        Ok(())
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let name = self.names[location.0 as usize].clone();
        self.uniform_uploads.push((name.clone(), value));
        self.current.insert(name, value);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.bound_textures.insert(unit, texture);
    }

    fn bind_vertex_array(&mut self, vao: VaoHandle) {
        self.bound_vao = Some(vao);
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), RenderError> {
        let vao = self.bound_vao.ok_or_else(|| RenderError::GpuError {
            reason: "draw without a vertex array".to_string(),
        })?;
        self.draws.push(RecordedDraw {
            vao,
            call: *call,
            uniforms: self.current.clone(),
            textures: self.bound_textures.clone(),
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn read_pixels(&mut self) -> Result<FrameImage, RenderError> {
        let viewport = self.frames.last().ok_or(RenderError::NoFrame)?;
        Ok(FrameImage {
            width: viewport.width,
            height: viewport.height,
            pixels: vec![0; viewport.width as usize * viewport.height as usize * 4],
            origin: ImageOrigin::BottomLeft,
        })
    }
}

pub(crate) fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn push_vertex_accessor(doc: &mut Document, data: Vec<u8>, dimensions: Dimensions, count: usize) -> usize {
    doc.buffers.push(Buffer { name: None, data: data.clone() });
    doc.buffer_views.push(BufferView {
        buffer: doc.buffers.len() - 1,
        byte_offset: 0,
        byte_length: data.len(),
        byte_stride: None,
        target: Some(BufferTarget::Vertex),
    });
    doc.accessors.push(Accessor {
        buffer_view: Some(doc.buffer_views.len() - 1),
        byte_offset: 0,
        component_type: ComponentType::F32,
        dimensions,
        normalized: false,
        count,
        min: None,
        max: None,
    });
    doc.accessors.len() - 1
}

/// One node drawing the triangle (0,0,0), (1,0,0), (0,1,0), non-indexed.
pub(crate) fn triangle_document() -> Document {
    let mut doc = Document::new();
    let positions = floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    let accessor = push_vertex_accessor(&mut doc, positions, Dimensions::Vec3, 3);

    let mut primitive = Primitive::default();
    primitive.attributes.insert(POSITION.to_string(), accessor);
    doc.meshes.push(Mesh {
        name: Some("triangle".to_string()),
        primitives: vec![primitive],
    });
    doc.nodes.push(Node {
        mesh: Some(0),
        ..Node::default()
    });
    doc.scenes.push(Scene {
        name: None,
        nodes: vec![0],
    });
    doc.default_scene = Some(0);
    doc
}

/// Give the first primitive TEXCOORD_0 matching its three vertices.
pub(crate) fn add_texcoords(doc: &mut Document) {
    let uvs = floats(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    let accessor = push_vertex_accessor(doc, uvs, Dimensions::Vec2, 3);
    doc.meshes[0].primitives[0]
        .attributes
        .insert(TEXCOORD_0.to_string(), accessor);
}

/// Index the first primitive with u16 indices 0, 1, 2 stored after two
/// bytes of padding.
pub(crate) fn add_indices(doc: &mut Document) {
    let data: Vec<u8> = [9u16, 0, 1, 2].iter().flat_map(|i| i.to_le_bytes()).collect();
    doc.buffers.push(Buffer { name: None, data });
    doc.buffer_views.push(BufferView {
        buffer: doc.buffers.len() - 1,
        byte_offset: 2,
        byte_length: 6,
        byte_stride: None,
        target: Some(BufferTarget::Index),
    });
    doc.accessors.push(Accessor {
        buffer_view: Some(doc.buffer_views.len() - 1),
        byte_offset: 0,
        component_type: ComponentType::U16,
        dimensions: Dimensions::Scalar,
        normalized: false,
        count: 3,
        min: None,
        max: None,
    });
    doc.meshes[0].primitives[0].indices = Some(doc.accessors.len() - 1);
}

/// Root translated by (5,0,0) with a child scaled by 2 holding the triangle.
pub(crate) fn two_node_document() -> Document {
    let mut doc = triangle_document();
    doc.nodes = vec![
        Node {
            name: Some("root".to_string()),
            transform: NodeTransform::Trs {
                translation: Vec3::new(5.0, 0.0, 0.0),
                rotation: glam::Quat::IDENTITY,
                scale: Vec3::ONE,
            },
            mesh: None,
            children: vec![1],
        },
        Node {
            name: Some("child".to_string()),
            transform: NodeTransform::Trs {
                translation: Vec3::ZERO,
                rotation: glam::Quat::IDENTITY,
                scale: Vec3::splat(2.0),
            },
            mesh: Some(0),
            children: vec![],
        },
    ];
    doc
}
