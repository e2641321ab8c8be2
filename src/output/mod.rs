use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::baking::{BakeArtifacts, BakeReport};
use crate::error::{BakeError, BakeLog, Result};
use crate::types::{ChannelKind, IndexedMesh};

/// Machine-readable summary written next to the baked assets.
#[derive(Debug, Serialize)]
pub struct BakeSummary<'a> {
    pub material: &'a str,
    pub atlas_size: u32,
    pub channels: Vec<ChannelKind>,
    pub vertices: usize,
    pub triangles: usize,
    pub logs: &'a [BakeLog],
}

/// Write all bake outputs: per-channel atlas PNGs, the merged OBJ + MTL,
/// and a JSON summary.
pub fn write_outputs(report: &BakeReport, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .map_err(|e| BakeError::Output(format!("Failed to create output dir: {e}")))?;

    let artifacts = match &report.artifacts {
        Some(a) => a,
        None => {
            // Quiet abort upstream: only the log summary is worth keeping.
            write_summary(report, None, out_dir)?;
            return Ok(());
        }
    };

    for atlas in &artifacts.atlases {
        let path = atlas_path(out_dir, &artifacts.material.name, &atlas.property);
        atlas
            .image
            .save(&path)
            .map_err(|e| BakeError::Output(format!("Failed to write atlas PNG: {e}")))?;
        info!(channel = %atlas.kind, path = %path.display(), "Wrote atlas");
    }

    write_obj(artifacts, out_dir)?;
    write_summary(report, Some(artifacts), out_dir)?;
    Ok(())
}

fn atlas_path(out_dir: &Path, material: &str, property: &str) -> PathBuf {
    out_dir.join(format!("{material}_{property}.png"))
}

/// Write the merged mesh as OBJ with an MTL referencing the atlases.
fn write_obj(artifacts: &BakeArtifacts, out_dir: &Path) -> Result<()> {
    let material = &artifacts.material.name;
    let mtl_name = format!("{material}.mtl");

    let obj_path = out_dir.join(format!("{material}.obj"));
    fs::write(&obj_path, format_obj(&artifacts.mesh, material, &mtl_name))
        .map_err(|e| BakeError::Output(format!("Failed to write OBJ: {e}")))?;

    let mtl_path = out_dir.join(&mtl_name);
    fs::write(&mtl_path, format_mtl(artifacts))
        .map_err(|e| BakeError::Output(format!("Failed to write MTL: {e}")))?;

    info!(
        vertices = artifacts.mesh.vertex_count(),
        triangles = artifacts.mesh.triangle_count(),
        path = %obj_path.display(),
        "Wrote merged mesh"
    );
    Ok(())
}

fn format_obj(mesh: &IndexedMesh, material: &str, mtl_name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "mtllib {mtl_name}");
    let _ = writeln!(out, "o {material}");

    for p in mesh.positions.chunks_exact(3) {
        let _ = writeln!(out, "v {} {} {}", p[0], p[1], p[2]);
    }
    // V-flip back to OBJ's bottom-left origin
    for uv in mesh.uvs.chunks_exact(2) {
        let _ = writeln!(out, "vt {} {}", uv[0], 1.0 - uv[1]);
    }
    for n in mesh.normals.chunks_exact(3) {
        let _ = writeln!(out, "vn {} {} {}", n[0], n[1], n[2]);
    }

    let _ = writeln!(out, "usemtl {material}");
    let has_normals = mesh.has_normals();
    for tri in mesh.indices.chunks_exact(3) {
        // OBJ indices are 1-based; position/uv/normal streams are aligned.
        let (a, b, c) = (tri[0] + 1, tri[1] + 1, tri[2] + 1);
        if has_normals {
            let _ = writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}");
        } else {
            let _ = writeln!(out, "f {a}/{a} {b}/{b} {c}/{c}");
        }
    }
    out
}

fn format_mtl(artifacts: &BakeArtifacts) -> String {
    let material = &artifacts.material.name;
    let mut out = String::new();
    let _ = writeln!(out, "newmtl {material}");
    let _ = writeln!(out, "Kd 1.0 1.0 1.0");

    for atlas in &artifacts.atlases {
        let file = format!("{material}_{}.png", atlas.property);
        let slot = match atlas.kind {
            ChannelKind::Albedo => "map_Kd",
            ChannelKind::Normal => "norm",
            ChannelKind::Specular => "map_Ks",
            ChannelKind::Occlusion => "map_Ka",
            ChannelKind::Height => "disp",
            // No standard MTL slot; keep the file discoverable anyway.
            _ => "map_Ke",
        };
        let _ = writeln!(out, "{slot} {file}");
    }
    out
}

/// Serialize the bake summary JSON.
fn write_summary(
    report: &BakeReport,
    artifacts: Option<&BakeArtifacts>,
    out_dir: &Path,
) -> Result<()> {
    let summary = BakeSummary {
        material: artifacts.map(|a| a.material.name.as_str()).unwrap_or(""),
        atlas_size: artifacts.map(|a| a.layout.size).unwrap_or(0),
        channels: artifacts
            .map(|a| a.atlases.iter().map(|atlas| atlas.kind).collect())
            .unwrap_or_default(),
        vertices: artifacts.map(|a| a.mesh.vertex_count()).unwrap_or(0),
        triangles: artifacts.map(|a| a.mesh.triangle_count()).unwrap_or(0),
        logs: &report.logs,
    };

    let path = out_dir.join("bake_report.json");
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| BakeError::Output(format!("Failed to serialize bake report: {e}")))?;
    fs::write(&path, json)
        .map_err(|e| BakeError::Output(format!("Failed to write bake report: {e}")))?;

    info!(path = %path.display(), "Wrote bake report");
    Ok(())
}
