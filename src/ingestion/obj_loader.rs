use std::path::{Path, PathBuf};

use glam::Mat4;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{BakeError, Result};
use crate::scene::{Scene, SceneNode};
use crate::types::{IndexedMesh, MaterialChannels, MaterialLibrary, SubmeshRange, TextureData};

/// MTL texture slots and the material property each one feeds.
const MTL_PROPERTIES: [(&str, fn(&tobj::Material) -> Option<&String>); 4] = [
    ("base_color", |m| m.diffuse_texture.as_ref()),
    ("normal", |m| m.normal_texture.as_ref()),
    ("specular", |m| m.specular_texture.as_ref()),
    ("occlusion", |m| m.ambient_texture.as_ref()),
];

/// Load an OBJ file (+ associated MTL and textures) into a `Scene`.
pub fn load_obj(path: &Path) -> Result<Scene> {
    let (models, materials_result) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .map_err(|e| BakeError::Input(format!("Failed to load OBJ: {e}")))?;

    debug!(model_count = models.len(), "Loaded OBJ models");

    let obj_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let tobj_materials = match materials_result {
        Ok(mats) => mats,
        Err(e) => {
            warn!("Failed to load MTL: {e}");
            Vec::new()
        }
    };

    let materials = convert_materials(&tobj_materials, obj_dir);

    let nodes: Vec<SceneNode> = models
        .into_iter()
        .map(|model| SceneNode {
            name: model.name.clone(),
            enabled: true,
            transform: Mat4::IDENTITY,
            material_indices: vec![model.mesh.material_id],
            mesh: convert_mesh(model.mesh),
        })
        .collect();

    Ok(Scene { nodes, materials })
}

/// Convert a `tobj::Mesh` into an `IndexedMesh` with one submesh
/// spanning all indices.
fn convert_mesh(mesh: tobj::Mesh) -> IndexedMesh {
    // UV V-flip: OBJ uses bottom-left origin, the atlas uses top-left
    let uvs: Vec<f32> = mesh
        .texcoords
        .chunks_exact(2)
        .flat_map(|uv| [uv[0], 1.0 - uv[1]])
        .collect();

    let index_count = mesh.indices.len();

    IndexedMesh {
        positions: mesh.positions,
        normals: mesh.normals,
        uvs,
        indices: mesh.indices,
        submeshes: vec![SubmeshRange {
            start: 0,
            count: index_count,
        }],
    }
}

/// Convert tobj materials into a `MaterialLibrary`, decoding every
/// referenced texture file in parallel.
fn convert_materials(tobj_mats: &[tobj::Material], obj_dir: &Path) -> MaterialLibrary {
    let mut lib = MaterialLibrary::default();

    // Collect (material, property, path) triples first so decoding can
    // fan out over all of them at once.
    let mut requests: Vec<(usize, &'static str, PathBuf)> = Vec::new();
    for (mat_idx, mat) in tobj_mats.iter().enumerate() {
        lib.materials.push(MaterialChannels {
            name: mat.name.clone(),
            ..Default::default()
        });
        for (property, slot) in MTL_PROPERTIES {
            if let Some(tex_name) = slot(mat) {
                requests.push((mat_idx, property, obj_dir.join(tex_name)));
            }
        }
    }

    let loaded: Vec<Option<TextureData>> = requests
        .par_iter()
        .map(|(_, _, path)| match load_texture(path) {
            Ok(tex) => Some(tex),
            Err(e) => {
                warn!(texture = %path.display(), "Failed to load texture: {e}");
                None
            }
        })
        .collect();

    for ((mat_idx, property, _), tex) in requests.into_iter().zip(loaded) {
        if let Some(tex) = tex {
            let tex_idx = lib.textures.len();
            lib.textures.push(tex);
            lib.materials[mat_idx]
                .properties
                .insert(property.to_string(), tex_idx);
        }
    }

    lib
}

/// Load a texture file: read raw bytes and decode for width/height.
fn load_texture(path: &Path) -> Result<TextureData> {
    let data = std::fs::read(path)
        .map_err(|e| BakeError::Input(format!("Failed to read texture {}: {e}", path.display())))?;

    let img = image::load_from_memory(&data).map_err(|e| {
        BakeError::Input(format!("Failed to decode texture {}: {e}", path.display()))
    })?;

    let mime_type = match path.extension().and_then(|e| e.to_str()) {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    debug!(
        path = %path.display(),
        width = img.width(),
        height = img.height(),
        "Loaded texture"
    );

    Ok(TextureData {
        data,
        mime_type: mime_type.to_string(),
        width: img.width(),
        height: img.height(),
    })
}
