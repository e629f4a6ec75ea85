//! Node transform resolution and scene bounds.

use glam::{Mat4, Vec3};
use tracing::warn;

use crate::geometry::BoundingBox;
use crate::scene::{Document, Node, NodeTransform, Primitive, Scene, POSITION};

/// Deepest node nesting followed before a branch is abandoned.
///
/// A node graph is expected to be a forest; this only stops a malformed
/// cycle from exhausting the stack.
pub const MAX_DEPTH: usize = 512;

/// Local transform of a node. An explicit matrix is used as-is.
pub fn local_matrix(node: &Node) -> Mat4 {
    match node.transform {
        NodeTransform::Matrix(matrix) => matrix,
        NodeTransform::Trs {
            translation,
            rotation,
            scale,
        } => Mat4::from_scale_rotation_translation(scale, rotation, translation),
    }
}

/// World transform of `node` under `parent`.
pub fn local_to_world(node: &Node, parent: &Mat4) -> Mat4 {
    *parent * local_matrix(node)
}

/// Depth-first walk from `roots`, visiting each node with its world matrix.
///
/// Children are visited in declaration order after their parent. Out of
/// range node indices are skipped.
pub fn traverse<F>(document: &Document, roots: &[usize], mut visit: F)
where
    F: FnMut(usize, &Node, &Mat4),
{
    for &root in roots {
        visit_node(document, root, &Mat4::IDENTITY, 0, &mut visit);
    }
}

fn visit_node<F>(document: &Document, index: usize, parent: &Mat4, depth: usize, visit: &mut F)
where
    F: FnMut(usize, &Node, &Mat4),
{
    let Some(node) = document.nodes.get(index) else {
        warn!(node = index, "skipping reference to missing node");
        return;
    };
    if depth >= MAX_DEPTH {
        warn!(node = index, "node hierarchy too deep, possible cycle");
        return;
    }

    let world = local_to_world(node, parent);
    visit(index, node, &world);

    for &child in &node.children {
        visit_node(document, child, &world, depth + 1, visit);
    }
}

/// World-space bounds of every primitive with a POSITION attribute.
///
/// Positions are decoded and transformed one by one; when they cannot be
/// read the accessor's declared min/max box is transformed instead.
/// Returns `None` when nothing contributes.
pub fn scene_bounds(document: &Document, scene: &Scene) -> Option<BoundingBox> {
    let mut bounds: Option<BoundingBox> = None;

    traverse(document, &scene.nodes, |_, node, world| {
        let Some(mesh) = node.mesh.and_then(|m| document.meshes.get(m)) else {
            return;
        };
        for primitive in &mesh.primitives {
            if let Some(prim_bounds) = primitive_bounds(document, primitive, world) {
                bounds = Some(match bounds {
                    Some(b) => b.union(&prim_bounds),
                    None => prim_bounds,
                });
            }
        }
    });

    bounds
}

fn primitive_bounds(document: &Document, primitive: &Primitive, world: &Mat4) -> Option<BoundingBox> {
    let accessor_index = primitive.attribute(POSITION)?;

    if let Ok(view) = document.accessor_view(accessor_index) {
        if view.is_zeroed() && !view.is_empty() {
            let origin = world.transform_point3(Vec3::ZERO);
            return Some(BoundingBox::new(origin, origin));
        }
        if view.components() >= 3 && !view.is_empty() {
            return BoundingBox::from_points(view.iter_vec3().map(|p| world.transform_point3(p)));
        }
    }

    let accessor = document.accessors.get(accessor_index)?;
    let min = accessor.min.as_deref().filter(|v| v.len() >= 3)?;
    let max = accessor.max.as_deref().filter(|v| v.len() >= 3)?;
    let local = BoundingBox::new(Vec3::new(min[0], min[1], min[2]), Vec3::new(max[0], max[1], max[2]));
    Some(local.transformed(world))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{
        Accessor, Buffer, BufferTarget, BufferView, ComponentType, Dimensions, Mesh,
    };
    use glam::Quat;
    use proptest::prelude::*;

    fn trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Node {
        Node {
            transform: NodeTransform::Trs {
                translation,
                rotation,
                scale,
            },
            ..Node::default()
        }
    }

    /// Root translated by (5,0,0) with a child scaled by 2 holding one triangle.
    fn two_node_document() -> Document {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mut doc = Document::new();
        doc.buffers.push(Buffer {
            name: None,
            data: positions.iter().flat_map(|f| f.to_le_bytes()).collect(),
        });
        doc.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: 0,
            byte_length: 36,
            byte_stride: None,
            target: Some(BufferTarget::Vertex),
        });
        doc.accessors.push(Accessor {
            buffer_view: Some(0),
            byte_offset: 0,
            component_type: ComponentType::F32,
            dimensions: Dimensions::Vec3,
            normalized: false,
            count: 3,
            min: Some(vec![0.0, 0.0, 0.0]),
            max: Some(vec![1.0, 1.0, 0.0]),
        });
        let mut primitive = Primitive::default();
        primitive.attributes.insert(POSITION.to_string(), 0);
        doc.meshes.push(Mesh {
            name: None,
            primitives: vec![primitive],
        });
        let mut root = trs(Vec3::new(5.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        root.children.push(1);
        let mut child = trs(Vec3::ZERO, Quat::IDENTITY, Vec3::splat(2.0));
        child.mesh = Some(0);
        doc.nodes = vec![root, child];
        doc.scenes.push(Scene {
            name: None,
            nodes: vec![0],
        });
        doc.default_scene = Some(0);
        doc
    }

    #[test]
    fn test_explicit_matrix_is_not_decomposed() {
        let matrix = Mat4::from_cols_array(&[
            1.0, 2.0, 0.0, 0.0, 0.0, 1.0, 3.0, 0.0, 0.5, 0.0, 1.0, 0.0, 4.0, 5.0, 6.0, 1.0,
        ]);
        let node = Node {
            transform: NodeTransform::Matrix(matrix),
            ..Node::default()
        };
        let parent = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(local_to_world(&node, &parent), parent * matrix);
    }

    #[test]
    fn test_default_trs_is_identity() {
        let parent = Mat4::from_rotation_y(0.3) * Mat4::from_translation(Vec3::X);
        assert_eq!(local_to_world(&Node::default(), &parent), parent);
    }

    #[test]
    fn test_trs_order() {
        let node = trs(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(2.0, 1.0, 1.0),
        );
        // scale, then rotate, then translate
        let p = local_matrix(&node).transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_traverse_order_and_world() {
        let doc = two_node_document();
        let mut visited = Vec::new();
        traverse(&doc, &[0], |index, _, world| visited.push((index, *world)));

        assert_eq!(visited.len(), 2);
        assert_eq!(visited[0].0, 0);
        assert_eq!(visited[1].0, 1);
        let p = visited[1].1.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p, Vec3::new(7.0, 0.0, 0.0));
    }

    #[test]
    fn test_traverse_skips_missing_children() {
        let mut doc = two_node_document();
        doc.nodes[1].children.push(42);
        let mut count = 0;
        traverse(&doc, &[0, 99], |_, _, _| count += 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_traverse_stops_on_cycle() {
        let mut doc = two_node_document();
        doc.nodes[1].children.push(0);
        let mut count = 0;
        traverse(&doc, &[0], |_, _, _| count += 1);
        assert_eq!(count, MAX_DEPTH);
    }

    #[test]
    fn test_scene_bounds_of_triangle() {
        let doc = two_node_document();
        let bounds = scene_bounds(&doc, &doc.scenes[0]).unwrap();
        assert_eq!(bounds.min, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(7.0, 2.0, 0.0));
    }

    #[test]
    fn test_scene_bounds_falls_back_to_min_max() {
        let mut doc = two_node_document();
        // break the buffer so positions cannot be decoded
        doc.buffers[0].data.truncate(4);
        let bounds = scene_bounds(&doc, &doc.scenes[0]).unwrap();
        assert_eq!(bounds.min, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(7.0, 2.0, 0.0));
    }

    #[test]
    fn test_scene_bounds_skips_overflowing_accessor() {
        let mut doc = two_node_document();
        doc.accessors[0].count = (1 << 62) + 1;
        doc.accessors[0].min = None;
        doc.accessors[0].max = None;
        assert!(scene_bounds(&doc, &doc.scenes[0]).is_none());
    }

    #[test]
    fn test_scene_bounds_of_zeroed_positions() {
        let mut doc = two_node_document();
        doc.accessors[0].buffer_view = None;
        doc.accessors[0].count = 1 << 40;
        let bounds = scene_bounds(&doc, &doc.scenes[0]).unwrap();
        assert_eq!(bounds.min, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_empty_scene_has_no_bounds() {
        let doc = Document::new();
        assert!(scene_bounds(&doc, &Scene::default()).is_none());
    }

    proptest! {
        #[test]
        fn test_matrix_nodes_compose_exactly(values in proptest::array::uniform16(-10.0f32..10.0)) {
            let matrix = Mat4::from_cols_array(&values);
            let node = Node { transform: NodeTransform::Matrix(matrix), ..Node::default() };
            prop_assert_eq!(local_to_world(&node, &Mat4::IDENTITY), matrix);
        }
    }
}
