//! Per-frame render settings and projection.

use glam::{Mat4, Vec3, Vec4};
use prism_core::BoundingBox;
use serde::{Deserialize, Serialize};

/// Scene size assumed when bounds are unknown or degenerate.
pub const FALLBACK_SCENE_SIZE: f32 = 100.0;

/// Lighting and shading switches, edited by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Polar angle of the light from +Y, in radians.
    pub light_theta: f32,
    /// Azimuth of the light around +Y, in radians.
    pub light_phi: f32,
    pub light_color: Vec3,
    pub light_intensity: f32,
    /// Light along the view direction instead of a world direction.
    pub light_from_camera: bool,
    pub normal_mapping: bool,
    pub clear_color: Vec4,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            light_theta: 0.72,
            light_phi: 2.6,
            light_color: Vec3::ONE,
            light_intensity: 3.0,
            light_from_camera: false,
            normal_mapping: false,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl RenderSettings {
    /// World-space direction towards the light.
    pub fn light_direction(&self) -> Vec3 {
        let (sin_theta, cos_theta) = self.light_theta.sin_cos();
        let (sin_phi, cos_phi) = self.light_phi.sin_cos();
        Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi)
    }

    /// Light color scaled by intensity.
    pub fn light_radiance(&self) -> Vec3 {
        self.light_color * self.light_intensity
    }

    /// Light direction as the shader sees it, in view space.
    pub fn view_light_direction(&self, view: &Mat4) -> Vec3 {
        if self.light_from_camera {
            Vec3::Z
        } else {
            view.transform_vector3(self.light_direction()).normalize_or_zero()
        }
    }
}

/// Perspective projection sized to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Vertical field of view in radians.
    pub fovy: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub const FOVY_DEGREES: f32 = 70.0;

    /// Planes derived from the bounds diagonal `d`: near 0.001·d, far 1.5·d.
    pub fn from_bounds(bounds: Option<&BoundingBox>) -> Self {
        let diagonal = scene_size(bounds);
        Self {
            fovy: Self::FOVY_DEGREES.to_radians(),
            near: 0.001 * diagonal,
            far: 1.5 * diagonal,
        }
    }

    /// Right-handed perspective with a 0..1 depth range.
    pub fn matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fovy, aspect, self.near, self.far)
    }
}

/// Size of the scene used to scale navigation speed.
pub fn scene_size(bounds: Option<&BoundingBox>) -> f32 {
    bounds
        .map(|b| b.diagonal().length())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(FALLBACK_SCENE_SIZE)
}
