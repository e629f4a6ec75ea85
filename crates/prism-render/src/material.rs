//! Material uniform binding.

use glam::{Vec3, Vec4};
use prism_core::Material;

use crate::device::{Device, UniformLocation, UniformValue};
use crate::resources::GpuResources;

pub const BASE_COLOR_UNIT: u32 = 0;
pub const METALLIC_ROUGHNESS_UNIT: u32 = 1;
pub const EMISSIVE_UNIT: u32 = 2;
pub const NORMAL_UNIT: u32 = 3;

/// Uniform locations of the material inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialUniforms {
    pub base_color_texture: Option<UniformLocation>,
    pub base_color_factor: Option<UniformLocation>,
    pub metallic_roughness_texture: Option<UniformLocation>,
    pub metallic_factor: Option<UniformLocation>,
    pub roughness_factor: Option<UniformLocation>,
    pub emissive_texture: Option<UniformLocation>,
    pub emissive_factor: Option<UniformLocation>,
    pub normal_texture: Option<UniformLocation>,
}

impl MaterialUniforms {
    pub fn query(device: &dyn Device) -> Self {
        Self {
            base_color_texture: device.uniform_location("uBaseColorTexture"),
            base_color_factor: device.uniform_location("uBaseColorFactor"),
            metallic_roughness_texture: device.uniform_location("uMetallicRoughnessTexture"),
            metallic_factor: device.uniform_location("uMetallicFactor"),
            roughness_factor: device.uniform_location("uRoughnessFactor"),
            emissive_texture: device.uniform_location("uEmissiveTexture"),
            emissive_factor: device.uniform_location("uEmissiveFactor"),
            normal_texture: device.uniform_location("uNormalTexture"),
        }
    }
}

/// Factors bound when a primitive has no material.
struct NeutralMaterial;

impl NeutralMaterial {
    const BASE_COLOR: Vec4 = Vec4::ONE;
    const METALLIC: f32 = 0.0;
    const ROUGHNESS: f32 = 0.0;
    const EMISSIVE: Vec3 = Vec3::ZERO;
}

/// Bind textures and factors for `material`, or neutral white when absent.
///
/// Absent textures bind the white stand-in so every unit samples something.
pub fn bind_material(
    device: &mut dyn Device,
    uniforms: &MaterialUniforms,
    resources: &GpuResources,
    material: Option<&Material>,
) {
    let (base_color, metallic, roughness, emissive, textures) = match material {
        Some(m) => (
            m.base_color_factor,
            m.metallic_factor,
            m.roughness_factor,
            m.emissive_factor,
            m.texture_slots(),
        ),
        None => (
            NeutralMaterial::BASE_COLOR,
            NeutralMaterial::METALLIC,
            NeutralMaterial::ROUGHNESS,
            NeutralMaterial::EMISSIVE,
            [None; 4],
        ),
    };

    let samplers = [
        (uniforms.base_color_texture, BASE_COLOR_UNIT),
        (uniforms.metallic_roughness_texture, METALLIC_ROUGHNESS_UNIT),
        (uniforms.emissive_texture, EMISSIVE_UNIT),
        (uniforms.normal_texture, NORMAL_UNIT),
    ];
    for ((location, unit), texture) in samplers.into_iter().zip(textures) {
        set(device, location, UniformValue::Int(unit as i32));
        device.bind_texture(unit, resources.texture_or_white(texture));
    }

    set(device, uniforms.base_color_factor, UniformValue::Vec4(base_color));
    set(device, uniforms.metallic_factor, UniformValue::Float(metallic));
    set(device, uniforms.roughness_factor, UniformValue::Float(roughness));
    set(device, uniforms.emissive_factor, UniformValue::Vec3(emissive));
}

/// Upload a uniform the program exposes; skip one it does not.
pub(crate) fn set(device: &mut dyn Device, location: Option<UniformLocation>, value: UniformValue) {
    if let Some(location) = location {
        device.set_uniform(location, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{triangle_document, RecordingDevice};
    use prism_core::{Image, ImageData, Texture};

    #[test]
    fn test_neutral_material() {
        let doc = triangle_document();
        let mut device = RecordingDevice::new();
        let resources = GpuResources::build(&mut device, &doc).unwrap();
        let uniforms = MaterialUniforms::query(&device);

        bind_material(&mut device, &uniforms, &resources, None);

        assert_eq!(device.uniform("uBaseColorFactor"), Some(UniformValue::Vec4(Vec4::ONE)));
        assert_eq!(device.uniform("uMetallicFactor"), Some(UniformValue::Float(0.0)));
        assert_eq!(device.uniform("uRoughnessFactor"), Some(UniformValue::Float(0.0)));
        assert_eq!(device.uniform("uEmissiveFactor"), Some(UniformValue::Vec3(Vec3::ZERO)));
        for unit in 0..4 {
            assert_eq!(device.bound_textures.get(&unit), Some(&resources.white_texture));
        }
    }

    #[test]
    fn test_material_textures_bind_to_units() {
        let mut doc = triangle_document();
        doc.images.push(Image {
            name: None,
            data: Some(ImageData { width: 1, height: 1, pixels: vec![0, 0, 0, 255] }),
        });
        doc.textures.push(Texture { source: Some(0), sampler: None });
        let material = Material {
            base_color_factor: Vec4::new(0.5, 0.5, 0.5, 1.0),
            emissive_texture: Some(0),
            ..Material::default()
        };

        let mut device = RecordingDevice::new();
        let resources = GpuResources::build(&mut device, &doc).unwrap();
        let uniforms = MaterialUniforms::query(&device);
        bind_material(&mut device, &uniforms, &resources, Some(&material));

        assert_eq!(device.bound_textures[&EMISSIVE_UNIT], resources.textures[0].unwrap());
        assert_eq!(device.bound_textures[&BASE_COLOR_UNIT], resources.white_texture);
        assert_eq!(device.uniform("uEmissiveTexture"), Some(UniformValue::Int(2)));
        assert_eq!(
            device.uniform("uBaseColorFactor"),
            Some(UniformValue::Vec4(Vec4::new(0.5, 0.5, 0.5, 1.0)))
        );
        assert_eq!(device.uniform("uMetallicFactor"), Some(UniformValue::Float(1.0)));
    }

    #[test]
    fn test_missing_locations_are_skipped() {
        let doc = triangle_document();
        let mut device = RecordingDevice::with_uniforms(&["uBaseColorFactor"]);
        let resources = GpuResources::build(&mut device, &doc).unwrap();
        let uniforms = MaterialUniforms::query(&device);
        bind_material(&mut device, &uniforms, &resources, None);

        assert_eq!(device.uniform_uploads.len(), 1);
        assert_eq!(device.uniform("uBaseColorFactor"), Some(UniformValue::Vec4(Vec4::ONE)));
    }
}
