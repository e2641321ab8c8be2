pub mod obj_loader;

use std::path::Path;

use tracing::{debug, info};

use crate::error::{BakeError, Result};
use crate::scene::Scene;
use crate::types::ChannelKind;

/// Summary statistics about an ingested scene, for logging and dry runs.
#[derive(Debug)]
pub struct SceneStats {
    pub node_count: usize,
    pub submesh_count: usize,
    pub total_vertices: usize,
    pub total_triangles: usize,
    pub has_normals: bool,
    pub has_uvs: bool,
    pub material_count: usize,
    /// Materials with a base color texture bound; the rest will bake as
    /// neutral-fill cells.
    pub textured_material_count: usize,
    pub texture_count: usize,
}

/// Load the input file into a `Scene`.
///
/// Only OBJ input is supported; the extension check runs before any I/O
/// so a wrong path fails fast.
pub fn ingest(input: &Path) -> Result<Scene> {
    if !input.exists() {
        return Err(BakeError::Input(format!(
            "Input file not found: {}",
            input.display()
        )));
    }

    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if ext != "obj" {
        return Err(BakeError::Input(format!(
            "Unsupported file format: .{ext}"
        )));
    }

    info!(path = %input.display(), "Loading OBJ scene");
    let scene = obj_loader::load_obj(input)?;

    let stats = compute_stats(&scene);
    debug!(
        nodes = stats.node_count,
        vertices = stats.total_vertices,
        triangles = stats.total_triangles,
        "Ingestion stats"
    );

    Ok(scene)
}

/// Compute summary statistics for a scene.
pub fn compute_stats(scene: &Scene) -> SceneStats {
    let meshes = scene.nodes.iter().map(|n| &n.mesh);

    SceneStats {
        node_count: scene.nodes.len(),
        submesh_count: meshes.clone().map(|m| m.submesh_count()).sum(),
        total_vertices: meshes.clone().map(|m| m.vertex_count()).sum(),
        total_triangles: meshes.clone().map(|m| m.triangle_count()).sum(),
        has_normals: meshes.clone().any(|m| m.has_normals()),
        has_uvs: meshes.clone().any(|m| m.has_uvs()),
        material_count: scene.materials.materials.len(),
        textured_material_count: scene
            .materials
            .materials
            .iter()
            .filter(|m| m.has_channel(ChannelKind::Albedo.default_property()))
            .count(),
        texture_count: scene.materials.textures.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_missing_file() {
        let err = ingest(Path::new("/nonexistent/model.obj")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn ingest_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.fbx");
        std::fs::write(&path, b"not a mesh").unwrap();
        let err = ingest(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }

    #[test]
    fn stats_count_textured_materials() {
        use crate::types::{MaterialChannels, TextureData};

        let mut scene = Scene::default();
        scene.materials.textures.push(TextureData {
            data: vec![0xFF; 4],
            mime_type: "image/raw".into(),
            width: 1,
            height: 1,
        });
        let mut textured = MaterialChannels {
            name: "brick".into(),
            ..Default::default()
        };
        textured.properties.insert("base_color".into(), 0);
        scene.materials.materials.push(textured);
        scene.materials.materials.push(MaterialChannels {
            name: "bare".into(),
            ..Default::default()
        });

        let stats = compute_stats(&scene);
        assert_eq!(stats.material_count, 2);
        assert_eq!(stats.textured_material_count, 1);
    }

    #[test]
    fn ingest_obj_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        std::fs::write(
            &path,
            concat!(
                "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n",
                "vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n",
                "f 1/1 2/2 3/3\nf 1/1 3/3 4/4\n",
            ),
        )
        .unwrap();

        let scene = ingest(&path).unwrap();
        assert_eq!(scene.nodes.len(), 1);
        let stats = compute_stats(&scene);
        assert_eq!(stats.total_triangles, 2);
        assert!(stats.has_uvs);
        assert!(!stats.has_normals);
    }
}
