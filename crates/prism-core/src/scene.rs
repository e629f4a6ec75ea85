//! In-memory glTF scene model.
//!
//! Every cross reference is an index into one of the tables on [`Document`].
//! An absent reference is `None`; a present one is only guaranteed to be in
//! range after it has been checked through the `Document` accessors, which
//! return [`CoreError`] rather than panicking.

use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::errors::CoreError;

/// Attribute semantic for vertex positions.
pub const POSITION: &str = "POSITION";
/// Attribute semantic for vertex normals.
pub const NORMAL: &str = "NORMAL";
/// Attribute semantic for the first texture coordinate set.
pub const TEXCOORD_0: &str = "TEXCOORD_0";
/// Attribute semantic for vertex tangents.
pub const TANGENT: &str = "TANGENT";

/// A loaded glTF document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub buffers: Vec<Buffer>,
    pub buffer_views: Vec<BufferView>,
    pub accessors: Vec<Accessor>,
    pub meshes: Vec<Mesh>,
    pub nodes: Vec<Node>,
    pub scenes: Vec<Scene>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub images: Vec<Image>,
    pub samplers: Vec<Sampler>,
    /// Scene drawn when no other scene is requested.
    pub default_scene: Option<usize>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accessor(&self, index: usize) -> Result<&Accessor, CoreError> {
        self.accessors
            .get(index)
            .ok_or(CoreError::MissingAccessor { index })
    }

    pub fn buffer_view(&self, index: usize) -> Result<&BufferView, CoreError> {
        self.buffer_views
            .get(index)
            .ok_or(CoreError::MissingBufferView { index })
    }

    pub fn buffer(&self, index: usize) -> Result<&Buffer, CoreError> {
        self.buffers
            .get(index)
            .ok_or(CoreError::MissingBuffer { index })
    }

    pub fn material(&self, index: usize) -> Result<&Material, CoreError> {
        self.materials
            .get(index)
            .ok_or(CoreError::MissingMaterial { index })
    }

    pub fn texture(&self, index: usize) -> Result<&Texture, CoreError> {
        self.textures
            .get(index)
            .ok_or(CoreError::MissingTexture { index })
    }

    pub fn mesh(&self, index: usize) -> Result<&Mesh, CoreError> {
        self.meshes.get(index).ok_or(CoreError::MissingMesh { index })
    }

    /// Scene to draw: the override when given, else the declared default.
    pub fn active_scene(&self, requested: Option<usize>) -> Option<&Scene> {
        requested
            .or(self.default_scene)
            .and_then(|index| self.scenes.get(index))
    }

    /// Total primitive count across all meshes.
    pub fn primitive_count(&self) -> usize {
        self.meshes.iter().map(|m| m.primitives.len()).sum()
    }
}

/// A raw byte blob.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub name: Option<String>,
    pub data: Vec<u8>,
}

/// Intended binding point of a buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data (`ARRAY_BUFFER`).
    Vertex,
    /// Index data (`ELEMENT_ARRAY_BUFFER`).
    Index,
}

impl BufferTarget {
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            34962 => Some(Self::Vertex),
            34963 => Some(Self::Index),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Index => "index",
        }
    }
}

/// A byte range of a buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    /// Distance between consecutive elements; `None` means tightly packed.
    pub byte_stride: Option<usize>,
    pub target: Option<BufferTarget>,
}

/// Storage type of a single accessor component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            5120 => Some(Self::I8),
            5121 => Some(Self::U8),
            5122 => Some(Self::I16),
            5123 => Some(Self::U16),
            5125 => Some(Self::U32),
            5126 => Some(Self::F32),
            _ => None,
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    /// Whether the type can index vertices.
    pub fn is_index_type(&self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32)
    }
}

/// Number of components per accessor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimensions {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl Dimensions {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT2" => Some(Self::Mat2),
            "MAT3" => Some(Self::Mat3),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    pub fn components(&self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }
}

/// A typed, strided view into a buffer view.
#[derive(Debug, Clone)]
pub struct Accessor {
    /// `None` means every element reads as zero.
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub dimensions: Dimensions,
    pub normalized: bool,
    pub count: usize,
    pub min: Option<Vec<f32>>,
    pub max: Option<Vec<f32>>,
}

impl Accessor {
    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.dimensions.components()
    }
}

/// Topology of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Points),
            1 => Some(Self::Lines),
            2 => Some(Self::LineLoop),
            3 => Some(Self::LineStrip),
            4 => Some(Self::Triangles),
            5 => Some(Self::TriangleStrip),
            6 => Some(Self::TriangleFan),
            _ => None,
        }
    }

    pub fn is_triangles(&self) -> bool {
        matches!(self, Self::Triangles | Self::TriangleStrip | Self::TriangleFan)
    }
}

/// One drawable piece of a mesh.
#[derive(Debug, Clone, Default)]
pub struct Primitive {
    pub mode: PrimitiveMode,
    /// Semantic name to accessor index, ordered by name.
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
}

impl Primitive {
    pub fn attribute(&self, semantic: &str) -> Option<usize> {
        self.attributes.get(semantic).copied()
    }

    /// Accessor used to size a non-indexed draw.
    pub fn first_attribute(&self) -> Option<usize> {
        self.attributes.values().next().copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

/// Local transform of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransform {
    Matrix(Mat4),
    Trs {
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    },
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::Trs {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: Option<String>,
    pub transform: NodeTransform,
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

/// A named list of root nodes.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub name: Option<String>,
    pub nodes: Vec<usize>,
}

/// Metallic-roughness material. Texture fields index [`Document::textures`].
#[derive(Debug, Clone)]
pub struct Material {
    pub name: Option<String>,
    pub base_color_factor: Vec4,
    pub base_color_texture: Option<usize>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<usize>,
    pub emissive_factor: Vec3,
    pub emissive_texture: Option<usize>,
    pub normal_texture: Option<usize>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color_factor: Vec4::ONE,
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            emissive_factor: Vec3::ZERO,
            emissive_texture: None,
            normal_texture: None,
        }
    }
}

impl Material {
    /// Texture references in unit order: base color, metallic-roughness,
    /// emissive, normal.
    pub fn texture_slots(&self) -> [Option<usize>; 4] {
        [
            self.base_color_texture,
            self.metallic_roughness_texture,
            self.emissive_texture,
            self.normal_texture,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Texture {
    pub source: Option<usize>,
    pub sampler: Option<usize>,
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// An image; `data` is `None` when the source could not be decoded.
#[derive(Debug, Clone, Default)]
pub struct Image {
    pub name: Option<String>,
    pub data: Option<ImageData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagFilter {
    Nearest,
    Linear,
}

impl MagFilter {
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            9728 => Some(Self::Nearest),
            9729 => Some(Self::Linear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl MinFilter {
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            9728 => Some(Self::Nearest),
            9729 => Some(Self::Linear),
            9984 => Some(Self::NearestMipmapNearest),
            9985 => Some(Self::LinearMipmapNearest),
            9986 => Some(Self::NearestMipmapLinear),
            9987 => Some(Self::LinearMipmapLinear),
            _ => None,
        }
    }

    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, Self::Nearest | Self::Linear)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    ClampToEdge,
    MirroredRepeat,
    #[default]
    Repeat,
}

impl WrapMode {
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            33071 => Some(Self::ClampToEdge),
            33648 => Some(Self::MirroredRepeat),
            10497 => Some(Self::Repeat),
            _ => None,
        }
    }
}

/// Sampler as declared; unset filters are resolved by the renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sampler {
    pub mag_filter: Option<MagFilter>,
    pub min_filter: Option<MinFilter>,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}
