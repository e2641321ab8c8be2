pub mod merger;
pub mod packer;
pub mod resizer;
pub mod synthesizer;
pub mod uv_bounds;

use std::collections::HashMap;

use image::RgbaImage;
use tracing::{debug, info};

use crate::config::{BakeConfig, ChannelConfig};
use crate::error::{BakeError, BakeLog, Result};
use crate::scene::{self, Scene};
use crate::types::{ChannelKind, IndexedMesh, MaterialTemplate};

use merger::{MergeInput, SubmeshUser};
use packer::AtlasLayout;
use synthesizer::SynthesisRequest;
use uv_bounds::SubmeshUvBounds;

/// Pipeline stage, for advisory progress reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeStage {
    Idle,
    Validating,
    Analyzing,
    Synthesizing,
    Packing,
    Remapping,
    Finalizing,
}

impl std::fmt::Display for BakeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BakeStage::Idle => "idle",
            BakeStage::Validating => "validating",
            BakeStage::Analyzing => "analyzing",
            BakeStage::Synthesizing => "synthesizing",
            BakeStage::Packing => "packing",
            BakeStage::Remapping => "remapping",
            BakeStage::Finalizing => "finalizing",
        };
        f.write_str(s)
    }
}

/// One atlas cell's worth of source textures and the submeshes that
/// sample it.
///
/// Non-tiling submeshes sharing a source material share one group; tiling
/// submeshes always get a dedicated group because their synthesized
/// composite depends on submesh-specific bounds.
#[derive(Debug)]
pub struct TextureGroup {
    pub material: usize,
    pub is_tiling: bool,
    /// Bounds driving synthesis: the single user's for tiling groups, the
    /// first user's otherwise.
    pub bounds: SubmeshUvBounds,
    /// Cell content size before edge padding.
    pub cell_w: u32,
    pub cell_h: u32,
    pub users: Vec<SubmeshUser>,
}

/// One packed channel atlas and the destination material property it
/// binds to.
#[derive(Debug)]
pub struct BakedAtlas {
    pub kind: ChannelKind,
    /// Property name the destination material exposes this atlas under;
    /// also drives the output file name.
    pub property: String,
    pub image: RgbaImage,
}

/// Final artifacts of a successful bake.
#[derive(Debug)]
pub struct BakeArtifacts {
    pub mesh: IndexedMesh,
    pub material: MaterialTemplate,
    /// One packed atlas per enabled channel.
    pub atlases: Vec<BakedAtlas>,
    pub layout: AtlasLayout,
}

/// What a bake hands back: artifacts (absent on a quiet abort) plus the
/// accumulated log list.
#[derive(Debug)]
pub struct BakeReport {
    pub artifacts: Option<BakeArtifacts>,
    pub logs: Vec<BakeLog>,
}

/// Cell size used when a group's albedo texture is missing entirely.
const FALLBACK_CELL: u32 = 256;

/// Run one bake: validate, analyze UV bounds, synthesize per-channel
/// cells, pack atlases, merge geometry, and remap UVs.
///
/// The stages run linearly with no branching back; configuration problems
/// and atlas overflow abort with an error before anything is produced,
/// while a mesh with no UVs aborts quietly with `artifacts: None`.
pub fn bake(scene: &Scene, config: &BakeConfig) -> Result<BakeReport> {
    let mut logs = Vec::new();

    debug!(stage = %BakeStage::Idle, "Bake requested");

    // Validating
    info!(stage = %BakeStage::Validating, "Bake started");
    config.validate()?;
    let template = config
        .destination_material
        .clone()
        .ok_or_else(|| BakeError::Configuration("no destination material assigned".into()))?;

    let candidates = scene::collect_candidates(scene, config.tiling_mode);
    if candidates.is_empty() {
        return Err(BakeError::Configuration(
            "no submeshes left to merge after filtering".into(),
        ));
    }

    // Analyzing: extract each candidate submesh, bound its UVs, and merge
    // the geometry so vertex offsets are known.
    info!(stage = %BakeStage::Analyzing, candidates = candidates.len(), "Analyzing UV bounds");
    let parts: Vec<IndexedMesh> = candidates
        .iter()
        .map(|c| merger::extract_submesh(&scene.nodes[c.node].mesh, c.submesh))
        .collect();

    let inputs: Vec<MergeInput<'_>> = candidates
        .iter()
        .zip(&parts)
        .map(|(c, part)| MergeInput {
            mesh: part,
            submesh: 0,
            transform: scene.nodes[c.node].transform,
        })
        .collect();
    let (mut merged, offsets) = merger::merge(&inputs);

    let mut groups = build_groups(scene, config, &candidates, &parts, &offsets);
    debug!(groups = groups.len(), "Built texture groups");

    // Synthesizing: albedo first -- it finalizes each group's edge-usage
    // fractions, which every other channel and the remapper consume.
    info!(stage = %BakeStage::Synthesizing, groups = groups.len(), "Synthesizing channel cells");
    let edge_px = config.edge_size;
    let mut channel_cells: Vec<(&ChannelConfig, Vec<RgbaImage>)> = Vec::new();

    let mut enabled: Vec<_> = config.enabled_channels().collect();
    enabled.sort_by_key(|c| c.kind != ChannelKind::Albedo);

    for channel in &enabled {
        let cells: Vec<RgbaImage> = groups
            .iter()
            .enumerate()
            .map(|(i, group)| {
                debug!(
                    channel = %channel.kind,
                    progress = format!("{}/{}", i + 1, groups.len()),
                    "Synthesizing cell"
                );
                let source = scene
                    .materials
                    .texture_for(group.material, &channel.source_property);
                let request = SynthesisRequest {
                    kind: channel.kind,
                    source,
                    bounds: &group.bounds,
                    is_tiling: group.is_tiling,
                    cell_w: group.cell_w,
                    cell_h: group.cell_h,
                    edge_px,
                    reconstruct_normal_z: config.reconstruct_normal_z,
                };
                synthesizer::synthesize(&request, &mut logs)
            })
            .collect();

        if channel.kind == ChannelKind::Albedo {
            for group in &mut groups {
                let padded_w = group.cell_w + 2 * edge_px;
                let padded_h = group.cell_h + 2 * edge_px;
                group.bounds.finalize_padding(edge_px, padded_w, padded_h);
                for user in &mut group.users {
                    user.bounds.finalize_padding(edge_px, padded_w, padded_h);
                }
            }
        }

        channel_cells.push((*channel, cells));
    }

    // Packing: layout computed once from the albedo cells, reused to
    // composite every channel so cells land at identical positions.
    info!(stage = %BakeStage::Packing, "Packing atlas");
    let sizes: Vec<(u32, u32)> = groups
        .iter()
        .map(|g| (g.cell_w + 2 * edge_px, g.cell_h + 2 * edge_px))
        .collect();
    let layout = packer::pack_layout(&sizes, config.padding.pixels(), config.atlas_resolution.pixels())?;
    if layout.rects.len() != groups.len() {
        // A partial atlas must never survive.
        return Err(BakeError::PackingOverflow {
            required: layout.size,
            max: config.atlas_resolution.pixels(),
        });
    }

    let atlases: Vec<BakedAtlas> = channel_cells
        .iter()
        .map(|(channel, cells)| {
            let refs: Vec<&RgbaImage> = cells.iter().collect();
            BakedAtlas {
                kind: channel.kind,
                property: channel.destination_property.clone(),
                image: packer::composite(&refs, &layout),
            }
        })
        .collect();

    // Remapping
    info!(stage = %BakeStage::Remapping, "Remapping UVs into atlas space");
    let group_users: Vec<(Vec<SubmeshUser>, bool)> = groups
        .iter()
        .map(|g| (g.users.clone(), g.is_tiling))
        .collect();
    if !merger::remap_uvs(&mut merged, &group_users, &layout) {
        info!("Merged mesh has no UVs; aborting bake without output");
        logs.push(BakeLog::info(
            "merged mesh has no UV vertices, bake aborted before writing UVs",
        ));
        return Ok(BakeReport {
            artifacts: None,
            logs,
        });
    }

    // Finalizing
    info!(
        stage = %BakeStage::Finalizing,
        vertices = merged.vertex_count(),
        triangles = merged.triangle_count(),
        atlas = layout.size,
        "Bake complete"
    );
    Ok(BakeReport {
        artifacts: Some(BakeArtifacts {
            mesh: merged,
            material: template,
            atlases,
            layout,
        }),
        logs,
    })
}

/// Assign each candidate to a texture group.
fn build_groups(
    scene: &Scene,
    config: &BakeConfig,
    candidates: &[scene::MergeCandidate],
    parts: &[IndexedMesh],
    offsets: &[usize],
) -> Vec<TextureGroup> {
    let albedo_property = config
        .channel(ChannelKind::Albedo)
        .map(|c| c.source_property.as_str())
        .unwrap_or("base_color");
    let max_cell = config.atlas_resolution.pixels();

    let mut groups: Vec<TextureGroup> = Vec::new();
    let mut shared: HashMap<usize, usize> = HashMap::new();

    for ((candidate, part), &start_vertex) in candidates.iter().zip(parts).zip(offsets) {
        let bounds = uv_bounds::analyze(&part.uvs, config.tiling_mode)
            .unwrap_or(SubmeshUvBounds::UNIT);
        let user = SubmeshUser {
            bounds,
            start_vertex,
            uvs: part.uvs.clone(),
        };

        if !bounds.is_tiling() {
            if let Some(&idx) = shared.get(&candidate.material) {
                groups[idx].users.push(user);
                continue;
            }
        }

        let (cell_w, cell_h) = scene
            .materials
            .texture_for(candidate.material, albedo_property)
            .map(|t| (t.width.min(max_cell), t.height.min(max_cell)))
            .unwrap_or((FALLBACK_CELL, FALLBACK_CELL));

        let idx = groups.len();
        groups.push(TextureGroup {
            material: candidate.material,
            is_tiling: bounds.is_tiling(),
            bounds,
            cell_w,
            cell_h,
            users: vec![user],
        });
        if !bounds.is_tiling() {
            shared.insert(candidate.material, idx);
        }
    }

    groups
}
