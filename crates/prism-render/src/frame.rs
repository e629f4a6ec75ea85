//! Per-frame scene drawing.

use glam::Mat4;
use prism_camera::Camera;
use prism_core::{scene_bounds, traverse, BoundingBox, CoreError, Document, Node, Primitive};
use tracing::{trace, warn};

use crate::device::{Device, DrawCall, UniformLocation, UniformValue, Viewport};
use crate::errors::RenderError;
use crate::material::{bind_material, set, MaterialUniforms};
use crate::resources::GpuResources;
use crate::settings::{Projection, RenderSettings};

/// Uniform locations queried once from the device's program.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameUniforms {
    pub model: Option<UniformLocation>,
    pub model_view_proj: Option<UniformLocation>,
    pub model_view: Option<UniformLocation>,
    pub normal_matrix: Option<UniformLocation>,
    pub light_direction: Option<UniformLocation>,
    pub light_intensity: Option<UniformLocation>,
    pub normal_mapping: Option<UniformLocation>,
    pub material: MaterialUniforms,
}

impl FrameUniforms {
    pub fn query(device: &dyn Device) -> Self {
        Self {
            model: device.uniform_location("uModelMatrix"),
            model_view_proj: device.uniform_location("uModelViewProjMatrix"),
            model_view: device.uniform_location("uModelViewMatrix"),
            normal_matrix: device.uniform_location("uNormalMatrix"),
            light_direction: device.uniform_location("uLightDirection"),
            light_intensity: device.uniform_location("uLightIntensity"),
            normal_mapping: device.uniform_location("uNormalMapping"),
            material: MaterialUniforms::query(device),
        }
    }
}

/// Counters for one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub nodes: usize,
    pub draw_calls: usize,
    /// Primitives without a vertex array.
    pub skipped: usize,
}

/// Draws the active scene of a document.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    uniforms: FrameUniforms,
    roots: Vec<usize>,
    bounds: Option<BoundingBox>,
    projection: Projection,
}

impl FrameRenderer {
    /// Prepare to draw `scene`, or the document's default scene.
    ///
    /// Without an active scene nothing is drawn and the projection falls
    /// back to the default scene size.
    pub fn new(device: &dyn Device, document: &Document, scene: Option<usize>) -> Self {
        let active = document.active_scene(scene);
        if active.is_none() {
            warn!("no scene to draw");
        }
        let roots = active.map(|s| s.nodes.clone()).unwrap_or_default();
        let bounds = active.and_then(|s| scene_bounds(document, s));

        Self {
            uniforms: FrameUniforms::query(device),
            roots,
            bounds,
            projection: Projection::from_bounds(bounds.as_ref()),
        }
    }

    pub fn bounds(&self) -> Option<&BoundingBox> {
        self.bounds.as_ref()
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Camera framing the scene bounds.
    pub fn default_camera(&self) -> Camera {
        Camera::frame_bounds(self.bounds.as_ref())
    }

    /// Draw one frame: every node reachable from the scene roots, depth-first.
    pub fn render(
        &self,
        device: &mut dyn Device,
        document: &Document,
        resources: &GpuResources,
        camera: &Camera,
        settings: &RenderSettings,
        viewport: Viewport,
    ) -> Result<FrameStats, RenderError> {
        device.begin_frame(viewport, settings.clear_color)?;

        let projection = self.projection.matrix(viewport.aspect());
        let view = camera.view_matrix();

        set(
            device,
            self.uniforms.light_direction,
            UniformValue::Vec3(settings.view_light_direction(&view)),
        );
        set(
            device,
            self.uniforms.light_intensity,
            UniformValue::Vec3(settings.light_radiance()),
        );
        set(
            device,
            self.uniforms.normal_mapping,
            UniformValue::Int(i32::from(settings.normal_mapping)),
        );

        let mut stats = FrameStats::default();
        let mut result = Ok(());
        traverse(document, &self.roots, |index, node, world| {
            if result.is_err() {
                return;
            }
            stats.nodes += 1;
            let pass = NodePass {
                document,
                resources,
                view: &view,
                projection: &projection,
            };
            result = self.draw_node(device, &pass, index, node, world, &mut stats);
        });
        result?;

        device.end_frame()?;
        trace!(nodes = stats.nodes, draws = stats.draw_calls, "frame rendered");
        Ok(stats)
    }

    fn draw_node(
        &self,
        device: &mut dyn Device,
        pass: &NodePass<'_>,
        index: usize,
        node: &Node,
        world: &Mat4,
        stats: &mut FrameStats,
    ) -> Result<(), RenderError> {
        let Some(mesh_index) = node.mesh else {
            return Ok(());
        };
        let Some(mesh) = pass.document.meshes.get(mesh_index) else {
            warn!(node = index, mesh = mesh_index, "node references a missing mesh");
            return Ok(());
        };

        let model_view = *pass.view * *world;
        let model_view_proj = *pass.projection * model_view;
        let normal_matrix = model_view.inverse().transpose();

        set(device, self.uniforms.model, UniformValue::Mat4(*world));
        set(device, self.uniforms.model_view, UniformValue::Mat4(model_view));
        set(device, self.uniforms.model_view_proj, UniformValue::Mat4(model_view_proj));
        set(device, self.uniforms.normal_matrix, UniformValue::Mat4(normal_matrix));

        for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
            let Some(vao) = pass.resources.vertex_array(mesh_index, primitive_index) else {
                stats.skipped += 1;
                continue;
            };
            let call = match draw_call(pass.document, primitive) {
                Ok(call) => call,
                Err(e) => {
                    warn!(mesh = mesh_index, primitive = primitive_index, "cannot draw primitive: {}", e);
                    stats.skipped += 1;
                    continue;
                }
            };

            let material = primitive.material.and_then(|m| pass.document.materials.get(m));
            bind_material(device, &self.uniforms.material, pass.resources, material);
            device.bind_vertex_array(vao);
            device.draw(&call)?;
            stats.draw_calls += 1;
        }

        Ok(())
    }
}

struct NodePass<'a> {
    document: &'a Document,
    resources: &'a GpuResources,
    view: &'a Mat4,
    projection: &'a Mat4,
}

/// Draw call for a primitive.
///
/// Indexed primitives read their index accessor from its absolute byte
/// offset; others draw the element count of their first attribute.
pub fn draw_call(document: &Document, primitive: &Primitive) -> Result<DrawCall, CoreError> {
    if let Some(indices) = primitive.indices {
        let resolved = document.resolve_index_accessor(indices)?;
        return Ok(DrawCall::Elements {
            mode: primitive.mode,
            count: resolved.count,
            index_type: resolved.component_type,
            byte_offset: resolved.byte_offset,
        });
    }

    let count = match primitive.first_attribute() {
        Some(accessor) => document.accessor(accessor)?.count,
        None => 0,
    };
    Ok(DrawCall::Arrays {
        mode: primitive.mode,
        count,
    })
}
