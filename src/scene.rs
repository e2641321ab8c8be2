use glam::Mat4;
use tracing::debug;

use crate::baking::uv_bounds;
use crate::config::TilingMode;
use crate::types::{IndexedMesh, MaterialLibrary};

/// One renderable node: a mesh with a world transform and one material
/// slot per submesh. `material_indices[i]` is `None` when slot `i` is
/// unassigned.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub enabled: bool,
    pub transform: Mat4,
    pub mesh: IndexedMesh,
    pub material_indices: Vec<Option<usize>>,
}

/// Everything a bake reads: nodes plus the shared material library.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub materials: MaterialLibrary,
}

/// A submesh that passed the candidate filter.
#[derive(Debug, Clone, Copy)]
pub struct MergeCandidate {
    pub node: usize,
    pub submesh: usize,
    pub material: usize,
}

/// Collect the submeshes eligible for merging.
///
/// Filter rules: node enabled, mesh non-empty, material slot count equal
/// to submesh count, no unassigned slots. In skip-all mode any submesh
/// whose UVs leave the unit square is excluded here, before the pipeline
/// ever sees it.
pub fn collect_candidates(scene: &Scene, mode: TilingMode) -> Vec<MergeCandidate> {
    let mut candidates = Vec::new();

    for (node_idx, node) in scene.nodes.iter().enumerate() {
        if !node.enabled || node.mesh.is_empty() {
            debug!(node = %node.name, "Skipping disabled or empty node");
            continue;
        }
        if node.material_indices.len() != node.mesh.submesh_count() {
            debug!(
                node = %node.name,
                slots = node.material_indices.len(),
                submeshes = node.mesh.submesh_count(),
                "Skipping node: material slot count mismatch"
            );
            continue;
        }
        if node.material_indices.iter().any(Option::is_none) {
            debug!(node = %node.name, "Skipping node: unassigned material slot");
            continue;
        }

        for (submesh, material) in node.material_indices.iter().enumerate() {
            let material = material.expect("checked above");

            if mode == TilingMode::SkipAll && node.mesh.has_uvs() {
                let outside = node
                    .mesh
                    .submesh_indices(submesh)
                    .iter()
                    .any(|&i| {
                        let vi = i as usize;
                        uv_bounds::exceeds_unit_range(&node.mesh.uvs[vi * 2..vi * 2 + 2])
                    });
                if outside {
                    debug!(
                        node = %node.name,
                        submesh,
                        "Skipping tiling submesh in skip-all mode"
                    );
                    continue;
                }
            }

            candidates.push(MergeCandidate {
                node: node_idx,
                submesh,
                material,
            });
        }
    }

    candidates
}
