/// Index range of one submesh inside a shared index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmeshRange {
    /// First index (not vertex) belonging to this submesh.
    pub start: usize,
    /// Number of indices.
    pub count: usize,
}

/// The fundamental geometry container.
///
/// All buffers are contiguous `Vec<f32>` / `Vec<u32>`. Indices are 32-bit
/// throughout, so merged meshes are never subject to a 16-bit vertex
/// ceiling.
#[derive(Debug, Clone, Default)]
pub struct IndexedMesh {
    /// Interleaved positions: [x, y, z, x, y, z, ...]
    pub positions: Vec<f32>,
    /// Interleaved normals: [nx, ny, nz, ...] or empty
    pub normals: Vec<f32>,
    /// Interleaved UVs: [u, v, u, v, ...] or empty
    pub uvs: Vec<f32>,
    /// Triangle indices into the vertex buffers
    pub indices: Vec<u32>,
    /// Per-submesh index ranges; one range covering all indices for a
    /// single-material mesh.
    pub submeshes: Vec<SubmeshRange>,
}

impl IndexedMesh {
    /// Number of vertices (positions / 3).
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles (indices / 3).
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    /// Whether the mesh contains no geometry.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    /// The index slice of one submesh.
    pub fn submesh_indices(&self, submesh: usize) -> &[u32] {
        let range = &self.submeshes[submesh];
        &self.indices[range.start..range.start + range.count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mesh() {
        let mesh = IndexedMesh::default();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
        assert_eq!(mesh.submesh_count(), 0);
        assert!(!mesh.has_normals());
        assert!(!mesh.has_uvs());
    }

    #[test]
    fn single_triangle() {
        let mesh = IndexedMesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            uvs: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
            submeshes: vec![SubmeshRange { start: 0, count: 3 }],
        };

        assert!(!mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.has_normals());
        assert!(mesh.has_uvs());
        assert_eq!(mesh.submesh_count(), 1);
    }

    #[test]
    fn submesh_index_slices() {
        let mesh = IndexedMesh {
            positions: vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
            submeshes: vec![
                SubmeshRange { start: 0, count: 3 },
                SubmeshRange { start: 3, count: 3 },
            ],
            ..Default::default()
        };

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.submesh_indices(0), &[0, 1, 2]);
        assert_eq!(mesh.submesh_indices(1), &[0, 2, 3]);
    }
}
