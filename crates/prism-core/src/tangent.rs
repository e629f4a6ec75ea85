//! Per-vertex tangents for normal mapping.

use glam::{Vec2, Vec3, Vec4};

use crate::errors::CoreError;
use crate::scene::{Document, Primitive, PrimitiveMode, NORMAL, POSITION, TEXCOORD_0};

/// Derive tangents for a triangle-list primitive lacking a TANGENT attribute.
///
/// Returns `Ok(None)` when the primitive has no POSITION or TEXCOORD_0, or is
/// not a triangle list. The w component carries the bitangent handedness.
pub fn generate_tangents(
    document: &Document,
    primitive: &Primitive,
) -> Result<Option<Vec<Vec4>>, CoreError> {
    if primitive.mode != PrimitiveMode::Triangles {
        return Ok(None);
    }
    let (Some(position_index), Some(uv_index)) =
        (primitive.attribute(POSITION), primitive.attribute(TEXCOORD_0))
    else {
        return Ok(None);
    };

    let positions: Vec<Vec3> = document.accessor_view(position_index)?.iter_vec3().collect();
    let uv_view = document.accessor_view(uv_index)?;
    let uvs: Vec<Vec2> = (0..uv_view.len()).map(|i| uv_view.read_vec2(i)).collect();
    let normals: Option<Vec<Vec3>> = match primitive.attribute(NORMAL) {
        Some(index) => Some(document.accessor_view(index)?.iter_vec3().collect()),
        None => None,
    };
    let indices = document
        .primitive_indices(primitive)?
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    Ok(Some(compute_tangents(&positions, normals.as_deref(), &uvs, &indices)))
}

/// Accumulate per-triangle tangent frames onto their vertices.
pub fn compute_tangents(
    positions: &[Vec3],
    normals: Option<&[Vec3]>,
    uvs: &[Vec2],
    indices: &[u32],
) -> Vec<Vec4> {
    let mut tangents = vec![Vec3::ZERO; positions.len()];
    let mut bitangents = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let (Some(&uv_a), Some(&uv_b), Some(&uv_c)) = (uvs.get(a), uvs.get(b), uvs.get(c)) else {
            continue;
        };

        let edge1 = positions[b] - positions[a];
        let edge2 = positions[c] - positions[a];
        let duv1 = uv_b - uv_a;
        let duv2 = uv_c - uv_a;

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;

        for v in [a, b, c] {
            tangents[v] += tangent;
            bitangents[v] += bitangent;
        }
    }

    tangents
        .iter()
        .zip(&bitangents)
        .enumerate()
        .map(|(i, (&t, &b))| {
            let n = normals
                .and_then(|n| n.get(i).copied())
                .unwrap_or(Vec3::Z);
            // Gram-Schmidt against the normal
            let t = (t - n * n.dot(t)).normalize_or_zero();
            if t == Vec3::ZERO {
                return Vec4::new(1.0, 0.0, 0.0, 1.0);
            }
            let w = if n.cross(t).dot(b) < 0.0 { -1.0 } else { 1.0 };
            t.extend(w)
        })
        .collect()
}
