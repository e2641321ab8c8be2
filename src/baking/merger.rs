use glam::{Mat3, Mat4, Vec3};

use crate::baking::packer::AtlasLayout;
use crate::baking::uv_bounds::SubmeshUvBounds;
use crate::types::{IndexedMesh, SubmeshRange};

/// One submesh selected for merging, with its world transform.
pub struct MergeInput<'a> {
    pub mesh: &'a IndexedMesh,
    pub submesh: usize,
    pub transform: Mat4,
}

/// A submesh's slot in the merged mesh: where its vertices start and a
/// copy of its original (local-space) UVs for the remapping pass.
#[derive(Debug, Clone)]
pub struct SubmeshUser {
    pub bounds: SubmeshUvBounds,
    /// Vertex offset of this submesh in the merged buffers.
    pub start_vertex: usize,
    /// Original UVs, flat `[u, v, ...]`, one pair per extracted vertex.
    pub uvs: Vec<f32>,
}

/// Pull one submesh out of its mesh as a self-contained vertex stream.
///
/// Scans the submesh's index slice, assigns new vertex ids in order of
/// first use, and rebuilds position/normal/uv arrays with only the
/// referenced vertices.
pub fn extract_submesh(mesh: &IndexedMesh, submesh: usize) -> IndexedMesh {
    let indices = mesh.submesh_indices(submesh);
    let vertex_count = mesh.vertex_count();

    let mut remap = vec![u32::MAX; vertex_count];
    let mut next_vertex: u32 = 0;
    for &idx in indices {
        let i = idx as usize;
        if remap[i] == u32::MAX {
            remap[i] = next_vertex;
            next_vertex += 1;
        }
    }
    let new_vertex_count = next_vertex as usize;

    let new_indices: Vec<u32> = indices.iter().map(|&i| remap[i as usize]).collect();

    let mut positions = vec![0.0f32; new_vertex_count * 3];
    let mut normals = if mesh.has_normals() {
        vec![0.0f32; new_vertex_count * 3]
    } else {
        vec![]
    };
    let mut uvs = if mesh.has_uvs() {
        vec![0.0f32; new_vertex_count * 2]
    } else {
        vec![]
    };

    for (old_idx, &new_idx) in remap.iter().enumerate() {
        if new_idx == u32::MAX {
            continue;
        }
        let ni = new_idx as usize;

        positions[ni * 3..ni * 3 + 3].copy_from_slice(&mesh.positions[old_idx * 3..old_idx * 3 + 3]);
        if mesh.has_normals() {
            normals[ni * 3..ni * 3 + 3].copy_from_slice(&mesh.normals[old_idx * 3..old_idx * 3 + 3]);
        }
        if mesh.has_uvs() {
            uvs[ni * 2..ni * 2 + 2].copy_from_slice(&mesh.uvs[old_idx * 2..old_idx * 2 + 2]);
        }
    }

    IndexedMesh {
        positions,
        normals,
        uvs,
        submeshes: vec![SubmeshRange {
            start: 0,
            count: new_indices.len(),
        }],
        indices: new_indices,
    }
}

/// Concatenate the extracted submeshes into one mesh, applying each
/// input's world transform. Returns the merged mesh plus the vertex
/// offset each input landed at, in input order.
///
/// Indices stay 32-bit, so the merge has no 16-bit vertex ceiling.
pub fn merge(inputs: &[MergeInput<'_>]) -> (IndexedMesh, Vec<usize>) {
    let mut merged = IndexedMesh::default();
    let mut offsets = Vec::with_capacity(inputs.len());

    // Streams must stay vertex-aligned across parts, so a part missing an
    // attribute that any other part carries contributes zeros.
    let any_normals = inputs.iter().any(|i| i.mesh.has_normals());
    let any_uvs = inputs.iter().any(|i| i.mesh.has_uvs());

    for input in inputs {
        let part = extract_submesh(input.mesh, input.submesh);
        let base_vertex = merged.vertex_count() as u32;
        let base_index = merged.indices.len();
        offsets.push(base_vertex as usize);

        let normal_matrix = Mat3::from_mat4(input.transform).inverse().transpose();

        for p in part.positions.chunks_exact(3) {
            let world = input
                .transform
                .transform_point3(Vec3::new(p[0], p[1], p[2]));
            merged.positions.extend_from_slice(&world.to_array());
        }
        if part.has_normals() {
            for n in part.normals.chunks_exact(3) {
                let world = (normal_matrix * Vec3::new(n[0], n[1], n[2])).normalize_or_zero();
                merged.normals.extend_from_slice(&world.to_array());
            }
        } else if any_normals {
            merged
                .normals
                .extend(std::iter::repeat(0.0).take(part.vertex_count() * 3));
        }
        // UVs are copied as-is; the remapping pass rewrites them once the
        // atlas layout is known.
        if part.has_uvs() {
            merged.uvs.extend_from_slice(&part.uvs);
        } else if any_uvs {
            merged
                .uvs
                .extend(std::iter::repeat(0.0).take(part.vertex_count() * 2));
        }

        merged
            .indices
            .extend(part.indices.iter().map(|&i| i + base_vertex));
        merged.submeshes.push(SubmeshRange {
            start: base_index,
            count: part.indices.len(),
        });
    }

    (merged, offsets)
}

/// Rewrite the merged mesh's UVs into atlas space.
///
/// Each user's vertices are remapped into their group's atlas rect: tiling
/// groups first shift their UVs to non-negative local space, coordinates
/// above 1 are normalized by the running per-axis maximum, then a
/// two-stage lerp places the normalized coordinate inside the
/// edge-trimmed inner portion of the rect. The edge border keeps existing
/// for mip sampling but is excluded from the visible footprint.
///
/// `group_users` pairs each atlas rect index with the users it serves;
/// `layout.rects` is index-aligned with the group order.
///
/// Returns `false` without touching the mesh when it has no UVs at all --
/// the caller aborts the bake quietly in that case.
pub fn remap_uvs(
    merged: &mut IndexedMesh,
    group_users: &[(Vec<SubmeshUser>, bool)],
    layout: &AtlasLayout,
) -> bool {
    if !merged.has_uvs() {
        return false;
    }

    for ((users, is_tiling), rect) in group_users.iter().zip(&layout.rects) {
        for user in users {
            let mut local = user.uvs.clone();

            if *is_tiling {
                // Unwrap negative offsets into positive local space so the
                // coordinates match the synthesized composite's layout.
                for uv in local.chunks_exact_mut(2) {
                    uv[0] -= user.bounds.min_u;
                    uv[1] -= user.bounds.min_v;
                }
            }

            let mut highest_u = 0.0f32;
            let mut highest_v = 0.0f32;
            for uv in local.chunks_exact(2) {
                highest_u = highest_u.max(uv[0].abs());
                highest_v = highest_v.max(uv[1].abs());
            }
            let scale_u = if highest_u > 1.0 { 1.0 / highest_u } else { 1.0 };
            let scale_v = if highest_v > 1.0 { 1.0 / highest_v } else { 1.0 };

            let (ex, ey) = (user.bounds.edge_use_u, user.bounds.edge_use_v);

            for (i, uv) in local.chunks_exact(2).enumerate() {
                let nu = uv[0] * scale_u;
                let nv = uv[1] * scale_v;

                // Lerp within the edge-trimmed cell interior, then within
                // the rect itself.
                let inner_u = lerp(ex, 1.0 - ex, nu);
                let inner_v = lerp(ey, 1.0 - ey, nv);
                let out_u = lerp(rect.min.x, rect.max.x, inner_u);
                let out_v = lerp(rect.min.y, rect.max.y, inner_v);

                let vi = user.start_vertex + i;
                merged.uvs[vi * 2] = out_u;
                merged.uvs[vi * 2 + 1] = out_v;
            }
        }
    }

    true
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baking::packer::AtlasRect;
    use crate::baking::uv_bounds;
    use crate::config::TilingMode;
    use glam::Vec2;

    fn quad(uv_scale: f32) -> IndexedMesh {
        IndexedMesh {
            positions: vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            ],
            normals: vec![
                0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
            ],
            uvs: vec![
                0.0,
                0.0,
                uv_scale,
                0.0,
                uv_scale,
                uv_scale,
                0.0,
                uv_scale,
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
            submeshes: vec![SubmeshRange { start: 0, count: 6 }],
        }
    }

    fn full_rect() -> AtlasRect {
        AtlasRect {
            min: Vec2::ZERO,
            max: Vec2::ONE,
        }
    }

    #[test]
    fn extract_keeps_only_referenced_vertices() {
        // 5 vertices, submesh 1 references only the last 3.
        let mesh = IndexedMesh {
            positions: vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0, 0.0, 0.0, 4.0, 0.0, 0.0,
            ],
            uvs: vec![0.0, 0.0, 0.1, 0.0, 0.2, 0.0, 0.3, 0.0, 0.4, 0.0],
            indices: vec![0, 1, 2, 2, 3, 4],
            submeshes: vec![
                SubmeshRange { start: 0, count: 3 },
                SubmeshRange { start: 3, count: 3 },
            ],
            ..Default::default()
        };

        let part = extract_submesh(&mesh, 1);
        assert_eq!(part.vertex_count(), 3);
        assert_eq!(part.indices, vec![0, 1, 2]);
        assert_eq!(part.positions[0], 2.0);
        assert!((part.uvs[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn merge_concatenates_with_transforms() {
        let a = quad(1.0);
        let b = quad(1.0);
        let shift = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));

        let (merged, offsets) = merge(&[
            MergeInput {
                mesh: &a,
                submesh: 0,
                transform: Mat4::IDENTITY,
            },
            MergeInput {
                mesh: &b,
                submesh: 0,
                transform: shift,
            },
        ]);

        assert_eq!(merged.vertex_count(), 8);
        assert_eq!(merged.triangle_count(), 4);
        assert_eq!(merged.submesh_count(), 2);
        assert_eq!(offsets, vec![0, 4]);

        // Second quad translated by +10 in X.
        assert!((merged.positions[4 * 3] - 10.0).abs() < 1e-6);
        // Indices of the second submesh offset past the first's vertices.
        assert_eq!(merged.submesh_indices(1), &[4, 5, 6, 4, 6, 7]);
        // Normals unchanged by pure translation.
        assert!((merged.normals[4 * 3 + 2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn remap_center_lands_at_rect_center() {
        // A UV at the exact center of its source must land at the exact
        // center of its rect, independent of edge settings.
        let mesh = quad(1.0);
        let (mut merged, offsets) = merge(&[MergeInput {
            mesh: &mesh,
            submesh: 0,
            transform: Mat4::IDENTITY,
        }]);
        // Overwrite one vertex to sit at the UV center.
        merged.uvs[0] = 0.5;
        merged.uvs[1] = 0.5;

        let mut bounds =
            uv_bounds::analyze(&[0.0, 0.0, 1.0, 1.0], TilingMode::Improved).unwrap();
        bounds.finalize_padding(16, 160, 160);

        let user = SubmeshUser {
            bounds,
            start_vertex: offsets[0],
            uvs: {
                let mut uvs = mesh.uvs.clone();
                uvs[0] = 0.5;
                uvs[1] = 0.5;
                uvs
            },
        };

        let rect = AtlasRect {
            min: Vec2::new(0.25, 0.5),
            max: Vec2::new(0.5, 0.75),
        };
        let layout = AtlasLayout {
            size: 256,
            rects: vec![rect],
        };

        let ok = remap_uvs(&mut merged, &[(vec![user], false)], &layout);
        assert!(ok);
        assert!((merged.uvs[0] - 0.375).abs() < 1e-6);
        assert!((merged.uvs[1] - 0.625).abs() < 1e-6);
    }

    #[test]
    fn remap_excludes_edge_border() {
        let mesh = quad(1.0);
        let (mut merged, offsets) = merge(&[MergeInput {
            mesh: &mesh,
            submesh: 0,
            transform: Mat4::IDENTITY,
        }]);

        let mut bounds =
            uv_bounds::analyze(&mesh.uvs, TilingMode::Improved).unwrap();
        // Edge is 1/10 of the padded cell.
        bounds.finalize_padding(10, 100, 100);

        let user = SubmeshUser {
            bounds,
            start_vertex: offsets[0],
            uvs: mesh.uvs.clone(),
        };
        let layout = AtlasLayout {
            size: 256,
            rects: vec![full_rect()],
        };

        remap_uvs(&mut merged, &[(vec![user], false)], &layout);

        // UV 0 maps to the inner edge of the border, not the rect edge.
        assert!((merged.uvs[0] - 0.1).abs() < 1e-6);
        // UV 1 maps to 1 - edge fraction.
        assert!((merged.uvs[4] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn remap_tiling_shifts_and_normalizes() {
        // UVs spanning [-0.5, 1.5]: after the shift they span [0, 2], the
        // running max is 2, so coordinates normalize by /2.
        let mesh = IndexedMesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            uvs: vec![-0.5, 0.0, 1.5, 0.0, 0.5, 1.0],
            indices: vec![0, 1, 2],
            submeshes: vec![SubmeshRange { start: 0, count: 3 }],
            ..Default::default()
        };
        let (mut merged, offsets) = merge(&[MergeInput {
            mesh: &mesh,
            submesh: 0,
            transform: Mat4::IDENTITY,
        }]);

        let bounds =
            uv_bounds::analyze(&mesh.uvs, TilingMode::Improved).unwrap();
        assert!(bounds.is_tiling());

        let user = SubmeshUser {
            bounds,
            start_vertex: offsets[0],
            uvs: mesh.uvs.clone(),
        };
        let layout = AtlasLayout {
            size: 256,
            rects: vec![full_rect()],
        };

        remap_uvs(&mut merged, &[(vec![user], true)], &layout);

        // Vertex 0: -0.5 shifted to 0, normalized to 0.
        assert!((merged.uvs[0] - 0.0).abs() < 1e-6);
        // Vertex 1: 1.5 shifted to 2, normalized to 1.
        assert!((merged.uvs[2] - 1.0).abs() < 1e-6);
        // Vertex 2: 0.5 shifted to 1, normalized to 0.5.
        assert!((merged.uvs[4] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn remap_without_uvs_aborts_quietly() {
        let mesh = IndexedMesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
            submeshes: vec![SubmeshRange { start: 0, count: 3 }],
            ..Default::default()
        };
        let (mut merged, _) = merge(&[MergeInput {
            mesh: &mesh,
            submesh: 0,
            transform: Mat4::IDENTITY,
        }]);

        let layout = AtlasLayout {
            size: 256,
            rects: vec![full_rect()],
        };
        let ok = remap_uvs(&mut merged, &[(vec![], false)], &layout);
        assert!(!ok);
        assert!(merged.uvs.is_empty());
    }
}
