//! glTF reader implementation.

use std::path::{Path, PathBuf};

use base64::Engine;
use glam::{Mat4, Quat, Vec3, Vec4};
use prism_core::{
    Accessor, Buffer, BufferTarget, BufferView, ComponentType, Dimensions, Document, Image,
    ImageData, MagFilter, Material, Mesh, MinFilter, Node, NodeTransform, Primitive,
    PrimitiveMode, Sampler, Scene, Texture, WrapMode,
};
use tracing::{debug, info, warn};

use super::schema::{self, Gltf};
use crate::error::{LoadError, Result};

/// GLB magic number.
const GLB_MAGIC: u32 = 0x46546C67; // "glTF" in little-endian
/// GLB version 2.
const GLB_VERSION: u32 = 2;
/// JSON chunk type.
const GLB_CHUNK_JSON: u32 = 0x4E4F534A; // "JSON" in little-endian
/// Binary chunk type.
const GLB_CHUNK_BIN: u32 = 0x004E4942; // "BIN\0" in little-endian

/// A parsed document plus the non-fatal problems found while reading it.
#[derive(Debug, Clone, Default)]
pub struct LoadedDocument {
    pub document: Document,
    pub warnings: Vec<String>,
}

/// Load a `.gltf` or `.glb` file, resolving external files next to it.
pub fn load(path: impl AsRef<Path>) -> Result<LoadedDocument> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;

    let mut reader = GltfReader::new();
    if let Some(parent) = path.parent() {
        reader = reader.with_base_dir(parent);
    }
    let loaded = reader.read(&data)?;

    for warning in &loaded.warnings {
        warn!(path = %path.display(), "{}", warning);
    }
    let doc = &loaded.document;
    info!(
        path = %path.display(),
        nodes = doc.nodes.len(),
        meshes = doc.meshes.len(),
        primitives = doc.primitive_count(),
        materials = doc.materials.len(),
        textures = doc.textures.len(),
        "loaded glTF document"
    );

    Ok(loaded)
}

/// Reader for glTF 2.0 files.
#[derive(Debug, Clone, Default)]
pub struct GltfReader {
    base_dir: Option<PathBuf>,
}

impl GltfReader {
    /// Create a reader that only accepts embedded data.
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Resolve relative URIs against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Whether `data` looks like a glTF JSON document or a GLB container.
    pub fn can_read(&self, data: &[u8]) -> bool {
        if read_u32(data, 0) == Some(GLB_MAGIC) {
            return true;
        }

        if let Ok(text) = std::str::from_utf8(data) {
            let trimmed = text.trim_start();
            if trimmed.starts_with('{') && trimmed.contains("\"asset\"") {
                return true;
            }
        }

        false
    }

    /// Parse a document from memory.
    pub fn read(&self, data: &[u8]) -> Result<LoadedDocument> {
        if read_u32(data, 0) == Some(GLB_MAGIC) {
            return self.read_glb(data);
        }
        self.read_json(data)
    }

    /// Read a GLB file.
    fn read_glb(&self, data: &[u8]) -> Result<LoadedDocument> {
        if data.len() < 12 {
            return Err(LoadError::Glb("shorter than its header"));
        }

        let version = read_u32(data, 4).unwrap_or_default();
        if version != GLB_VERSION {
            return Err(LoadError::GlbVersion(version));
        }

        let mut offset = 12;
        let mut json_data: Option<&[u8]> = None;
        let mut bin_data: Option<&[u8]> = None;

        while offset + 8 <= data.len() {
            let chunk_length = read_u32(data, offset).unwrap_or_default() as usize;
            let chunk_type = read_u32(data, offset + 4).unwrap_or_default();
            offset += 8;

            if offset + chunk_length > data.len() {
                return Err(LoadError::Glb("chunk extends past end of file"));
            }

            match chunk_type {
                GLB_CHUNK_JSON => json_data = Some(&data[offset..offset + chunk_length]),
                GLB_CHUNK_BIN => bin_data = Some(&data[offset..offset + chunk_length]),
                other => debug!(chunk_type = other, "skipping unknown GLB chunk"),
            }

            offset += chunk_length;
            // Chunks are 4-byte aligned
            offset = (offset + 3) & !3;
        }

        let json_data = json_data.ok_or(LoadError::Glb("no JSON chunk"))?;
        let gltf: Gltf = serde_json::from_slice(json_data)?;
        self.convert(&gltf, bin_data)
    }

    /// Read a JSON glTF file.
    fn read_json(&self, data: &[u8]) -> Result<LoadedDocument> {
        let gltf: Gltf = serde_json::from_slice(data)?;
        self.convert(&gltf, None)
    }

    fn convert(&self, gltf: &Gltf, bin_data: Option<&[u8]>) -> Result<LoadedDocument> {
        let mut warnings = Vec::new();
        check_asset(gltf, &mut warnings)?;

        let buffers = self.load_buffers(gltf, bin_data, &mut warnings)?;

        let mut document = Document::new();
        document.buffer_views = convert_buffer_views(gltf, &mut warnings);
        document.accessors = convert_accessors(gltf)?;
        document.meshes = convert_meshes(gltf)?;
        document.nodes = gltf.nodes.iter().map(convert_node).collect();
        document.scenes = gltf
            .scenes
            .iter()
            .map(|s| Scene {
                name: s.name.clone(),
                nodes: s.nodes.clone(),
            })
            .collect();
        document.default_scene = gltf.scene;
        document.materials = gltf.materials.iter().map(convert_material).collect();
        document.textures = gltf
            .textures
            .iter()
            .map(|t| Texture {
                source: t.source,
                sampler: t.sampler,
            })
            .collect();
        document.samplers = convert_samplers(gltf, &mut warnings);
        document.images = gltf
            .images
            .iter()
            .enumerate()
            .map(|(i, image)| self.convert_image(gltf, &buffers, i, image, &mut warnings))
            .collect();
        document.buffers = buffers;

        if gltf.scene.is_none() && !gltf.scenes.is_empty() {
            warnings.push("document declares no default scene".to_string());
        }

        Ok(LoadedDocument { document, warnings })
    }

    /// Load every buffer, taking an unnamed first buffer from the GLB chunk.
    fn load_buffers(
        &self,
        gltf: &Gltf,
        bin_data: Option<&[u8]>,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<Buffer>> {
        let mut buffers = Vec::with_capacity(gltf.buffers.len());

        for (i, buffer) in gltf.buffers.iter().enumerate() {
            let mut data = match (&buffer.uri, bin_data) {
                (Some(uri), _) => self.load_uri(uri)?,
                (None, Some(bin)) if i == 0 => bin.to_vec(),
                (None, _) => {
                    return Err(LoadError::MissingBufferData(i));
                }
            };

            if data.len() < buffer.byte_length {
                warnings.push(format!(
                    "buffer {} holds {} bytes but declares {}",
                    i,
                    data.len(),
                    buffer.byte_length
                ));
            } else {
                data.truncate(buffer.byte_length);
            }

            buffers.push(Buffer {
                name: buffer.name.clone(),
                data,
            });
        }

        Ok(buffers)
    }

    /// Load bytes from a data URI or a file relative to the base directory.
    fn load_uri(&self, uri: &str) -> Result<Vec<u8>> {
        if uri.starts_with("data:") {
            return decode_data_uri(uri);
        }

        let base = self
            .base_dir
            .as_ref()
            .ok_or_else(|| LoadError::ExternalUri(uri.to_string()))?;
        let path = base.join(percent_decode(uri));
        std::fs::read(&path).map_err(|e| LoadError::io(path, e))
    }

    fn convert_image(
        &self,
        gltf: &Gltf,
        buffers: &[Buffer],
        index: usize,
        image: &schema::Image,
        warnings: &mut Vec<String>,
    ) -> Image {
        let encoded = match (&image.uri, image.buffer_view) {
            (Some(uri), _) => self.load_uri(uri).map_err(|e| e.to_string()),
            (None, Some(view)) => read_buffer_view_raw(gltf, buffers, view),
            (None, None) => Err("image has neither uri nor bufferView".to_string()),
        };

        let data = encoded.and_then(|bytes| {
            image::load_from_memory(&bytes)
                .map(|decoded| {
                    let rgba = decoded.to_rgba8();
                    ImageData {
                        width: rgba.width(),
                        height: rgba.height(),
                        pixels: rgba.into_raw(),
                    }
                })
                .map_err(|e| e.to_string())
        });

        match data {
            Ok(data) => Image {
                name: image.name.clone(),
                data: Some(data),
            },
            Err(reason) => {
                warnings.push(format!("image {} could not be loaded: {}", index, reason));
                Image {
                    name: image.name.clone(),
                    data: None,
                }
            }
        }
    }
}

fn check_asset(gltf: &Gltf, warnings: &mut Vec<String>) -> Result<()> {
    let major = gltf.asset.version.split('.').next().unwrap_or_default();
    if major != "2" {
        return Err(LoadError::AssetVersion(gltf.asset.version.clone()));
    }

    for extension in &gltf.extensions_required {
        warnings.push(format!("required extension {} is not supported", extension));
    }

    Ok(())
}

fn convert_buffer_views(gltf: &Gltf, warnings: &mut Vec<String>) -> Vec<BufferView> {
    gltf.buffer_views
        .iter()
        .enumerate()
        .map(|(i, view)| {
            let target = view.target.and_then(|t| {
                let target = BufferTarget::from_gl(t);
                if target.is_none() {
                    warnings.push(format!("buffer view {} has unknown target {}", i, t));
                }
                target
            });
            BufferView {
                buffer: view.buffer,
                byte_offset: view.byte_offset,
                byte_length: view.byte_length,
                byte_stride: view.byte_stride,
                target,
            }
        })
        .collect()
}

fn convert_accessors(gltf: &Gltf) -> Result<Vec<Accessor>> {
    gltf.accessors
        .iter()
        .enumerate()
        .map(|(i, accessor)| {
            let component_type = ComponentType::from_gl(accessor.component_type).ok_or_else(|| {
                LoadError::invalid(
                    format!("accessor {}", i),
                    format!("unknown component type {}", accessor.component_type),
                )
            })?;
            let dimensions = Dimensions::parse(&accessor.accessor_type).ok_or_else(|| {
                LoadError::invalid(
                    format!("accessor {}", i),
                    format!("unknown accessor type {}", accessor.accessor_type),
                )
            })?;
            let to_f32 = |v: &Vec<f64>| v.iter().map(|&x| x as f32).collect::<Vec<f32>>();

            Ok(Accessor {
                buffer_view: accessor.buffer_view,
                byte_offset: accessor.byte_offset,
                component_type,
                dimensions,
                normalized: accessor.normalized,
                count: accessor.count,
                min: accessor.min.as_ref().map(to_f32),
                max: accessor.max.as_ref().map(to_f32),
            })
        })
        .collect()
}

fn convert_meshes(gltf: &Gltf) -> Result<Vec<Mesh>> {
    gltf.meshes
        .iter()
        .enumerate()
        .map(|(mesh_index, mesh)| {
            let primitives = mesh
                .primitives
                .iter()
                .map(|prim| {
                    let mode = PrimitiveMode::from_gl(prim.mode).ok_or_else(|| {
                        LoadError::invalid(
                            format!("mesh {}", mesh_index),
                            format!("unknown primitive mode {}", prim.mode),
                        )
                    })?;
                    Ok(Primitive {
                        mode,
                        attributes: prim.attributes.clone(),
                        indices: prim.indices,
                        material: prim.material,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Mesh {
                name: mesh.name.clone(),
                primitives,
            })
        })
        .collect()
}

fn convert_node(node: &schema::Node) -> Node {
    let transform = match node.matrix {
        Some(matrix) => NodeTransform::Matrix(Mat4::from_cols_array(&matrix)),
        None => NodeTransform::Trs {
            translation: node.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
            rotation: node.rotation.map(Quat::from_array).unwrap_or(Quat::IDENTITY),
            scale: node.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
        },
    };

    Node {
        name: node.name.clone(),
        transform,
        mesh: node.mesh,
        children: node.children.clone(),
    }
}

fn convert_material(material: &schema::Material) -> Material {
    let pbr = material.pbr_metallic_roughness.clone().unwrap_or_default();
    Material {
        name: material.name.clone(),
        base_color_factor: Vec4::from_array(pbr.base_color_factor),
        base_color_texture: pbr.base_color_texture.map(|t| t.index),
        metallic_factor: pbr.metallic_factor,
        roughness_factor: pbr.roughness_factor,
        metallic_roughness_texture: pbr.metallic_roughness_texture.map(|t| t.index),
        emissive_factor: Vec3::from_array(material.emissive_factor),
        emissive_texture: material.emissive_texture.as_ref().map(|t| t.index),
        normal_texture: material.normal_texture.as_ref().map(|t| t.index),
    }
}

fn convert_samplers(gltf: &Gltf, warnings: &mut Vec<String>) -> Vec<Sampler> {
    gltf.samplers
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut wrap = |value: u32| {
                WrapMode::from_gl(value).unwrap_or_else(|| {
                    warnings.push(format!("sampler {} has unknown wrap mode {}", i, value));
                    WrapMode::Repeat
                })
            };
            let wrap_s = wrap(s.wrap_s);
            let wrap_t = wrap(s.wrap_t);
            Sampler {
                mag_filter: s.mag_filter.and_then(MagFilter::from_gl),
                min_filter: s.min_filter.and_then(MinFilter::from_gl),
                wrap_s,
                wrap_t,
            }
        })
        .collect()
}

/// Read raw buffer view data.
fn read_buffer_view_raw(
    gltf: &Gltf,
    buffers: &[Buffer],
    buffer_view_idx: usize,
) -> std::result::Result<Vec<u8>, String> {
    let view = gltf
        .buffer_views
        .get(buffer_view_idx)
        .ok_or_else(|| format!("invalid buffer view {}", buffer_view_idx))?;

    let buffer = buffers
        .get(view.buffer)
        .ok_or_else(|| format!("invalid buffer {}", view.buffer))?;

    let start = view.byte_offset;
    let end = start + view.byte_length;

    buffer
        .data
        .get(start..end)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| "buffer view out of bounds".to_string())
}

/// Decode a data URI.
fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    // Format: data:[<mediatype>][;base64],<data>
    let (header, data) = uri
        .split_once(',')
        .ok_or(LoadError::DataUri)?;

    if header.ends_with(";base64") {
        Ok(base64::engine::general_purpose::STANDARD.decode(data)?)
    } else {
        Ok(percent_decode(data).into_bytes())
    }
}

/// Undo `%XX` escapes in a URI reference.
fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::{BufferTarget, POSITION};

    fn encode(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn triangle_json(extra_image: &str) -> String {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.5, 1.0, 0.0];
        let indices: [u16; 3] = [0, 1, 2];
        let mut buffer_data: Vec<u8> = positions.iter().flat_map(|f| f.to_le_bytes()).collect();
        buffer_data.extend(indices.iter().flat_map(|i| i.to_le_bytes()));

        format!(
            r#"{{
            "asset": {{"version": "2.0"}},
            "scene": 0,
            "scenes": [{{"nodes": [0]}}],
            "nodes": [
                {{"children": [1], "translation": [5.0, 0.0, 0.0]}},
                {{"mesh": 0, "scale": [2.0, 2.0, 2.0], "name": "Triangle"}}
            ],
            "meshes": [{{
                "primitives": [{{
                    "attributes": {{"POSITION": 0}},
                    "indices": 1,
                    "material": 0
                }}]
            }}],
            "materials": [{{
                "pbrMetallicRoughness": {{"baseColorFactor": [0.5, 0.5, 0.5, 1.0], "baseColorTexture": {{"index": 0}}}},
                "emissiveFactor": [1.0, 0.0, 0.0]
            }}],
            "textures": [{{"source": 0, "sampler": 0}}],
            "samplers": [{{"minFilter": 9987, "wrapS": 33071}}],
            "images": [{}],
            "accessors": [
                {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
                {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
            ],
            "bufferViews": [
                {{"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962}},
                {{"buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963}}
            ],
            "buffers": [{{
                "byteLength": 42,
                "uri": "data:application/octet-stream;base64,{}"
            }}]
        }}"#,
            extra_image,
            encode(&buffer_data)
        )
    }

    #[test]
    fn test_can_read() {
        let reader = GltfReader::new();
        assert!(reader.can_read(b"glTF\x02\x00\x00\x00"));
        assert!(reader.can_read(br#"{"asset": {"version": "2.0"}}"#));
        assert!(!reader.can_read(b"random"));
    }

    #[test]
    fn test_decode_data_uri() {
        let result = decode_data_uri("data:application/octet-stream;base64,SGVsbG8=").unwrap();
        assert_eq!(result, b"Hello");
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("my%20model.bin"), "my model.bin");
        assert_eq!(percent_decode("plain.bin"), "plain.bin");
        assert_eq!(percent_decode("trailing%2"), "trailing%2");
    }

    #[test]
    fn test_minimal_gltf() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "scenes": [{"nodes": [0]}],
            "nodes": [{"name": "TestNode"}]
        }"#;

        let loaded = GltfReader::new().read(json).unwrap();
        assert_eq!(loaded.document.nodes.len(), 1);
        assert_eq!(loaded.document.nodes[0].name.as_deref(), Some("TestNode"));
        assert_eq!(loaded.document.default_scene, None);
        assert_eq!(loaded.warnings.len(), 1);
    }

    #[test]
    fn test_gltf_with_mesh_and_material() {
        let image = format!(r#"{{"uri": "data:image/png;base64,{}"}}"#, encode(&png_bytes(2, 2)));
        let loaded = GltfReader::new().read(triangle_json(&image).as_bytes()).unwrap();
        assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);

        let doc = &loaded.document;
        assert_eq!(doc.default_scene, Some(0));
        assert_eq!(doc.buffers[0].data.len(), 42);
        assert_eq!(doc.buffer_views[1].target, Some(BufferTarget::Index));
        assert_eq!(doc.accessors[0].dimensions, Dimensions::Vec3);
        assert_eq!(doc.meshes[0].primitives[0].attribute(POSITION), Some(0));
        assert_eq!(doc.meshes[0].primitives[0].mode, PrimitiveMode::Triangles);

        match doc.nodes[1].transform {
            NodeTransform::Trs { scale, translation, .. } => {
                assert_eq!(scale, Vec3::splat(2.0));
                assert_eq!(translation, Vec3::ZERO);
            }
            NodeTransform::Matrix(_) => panic!("expected TRS"),
        }

        let material = &doc.materials[0];
        assert_eq!(material.base_color_factor, Vec4::new(0.5, 0.5, 0.5, 1.0));
        assert_eq!(material.base_color_texture, Some(0));
        assert_eq!(material.metallic_factor, 1.0);
        assert_eq!(material.emissive_factor, Vec3::new(1.0, 0.0, 0.0));

        assert_eq!(doc.samplers[0].min_filter, Some(MinFilter::LinearMipmapLinear));
        assert_eq!(doc.samplers[0].mag_filter, None);
        assert_eq!(doc.samplers[0].wrap_s, WrapMode::ClampToEdge);
        assert_eq!(doc.samplers[0].wrap_t, WrapMode::Repeat);

        let data = doc.images[0].data.as_ref().unwrap();
        assert_eq!((data.width, data.height), (2, 2));
        assert_eq!(&data.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_bad_image_is_a_warning() {
        let image = format!(r#"{{"uri": "data:image/png;base64,{}"}}"#, encode(b"not a png"));
        let loaded = GltfReader::new().read(triangle_json(&image).as_bytes()).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.document.images[0].data.is_none());
    }

    #[test]
    fn test_explicit_matrix_wins() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "nodes": [{"matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 3,4,5,1], "translation": [9, 9, 9]}]
        }"#;
        let loaded = GltfReader::new().read(json).unwrap();
        match loaded.document.nodes[0].transform {
            NodeTransform::Matrix(m) => assert_eq!(m.w_axis, Vec4::new(3.0, 4.0, 5.0, 1.0)),
            NodeTransform::Trs { .. } => panic!("expected matrix"),
        }
    }

    #[test]
    fn test_glb_container() {
        let json = br#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":4}]}"#;
        let mut json_chunk = json.to_vec();
        while json_chunk.len() % 4 != 0 {
            json_chunk.push(b' ');
        }
        let bin_chunk = [1u8, 2, 3, 4];

        let mut glb = Vec::new();
        glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
        let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
        glb.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
        glb.extend_from_slice(&json_chunk);
        glb.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
        glb.extend_from_slice(&GLB_CHUNK_BIN.to_le_bytes());
        glb.extend_from_slice(&bin_chunk);

        let loaded = GltfReader::new().read(&glb).unwrap();
        assert_eq!(loaded.document.buffers[0].data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unsupported_version() {
        let json = br#"{"asset": {"version": "1.0"}}"#;
        assert!(matches!(GltfReader::new().read(json), Err(LoadError::AssetVersion(v)) if v == "1.0"));
    }

    #[test]
    fn test_unknown_component_type() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "accessors": [{"componentType": 1234, "count": 1, "type": "VEC3"}]
        }"#;
        assert!(matches!(GltfReader::new().read(json), Err(LoadError::Invalid { .. })));
    }

    #[test]
    fn test_external_buffer_needs_base_dir() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 4, "uri": "data.bin"}]
        }"#;
        assert!(matches!(GltfReader::new().read(json), Err(LoadError::ExternalUri(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(load("/definitely/not/here.gltf"), Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(GltfReader::new().read(b"{ nope"), Err(LoadError::Json(_))));
    }
}
