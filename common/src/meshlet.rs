use crate::{BoundingSphere, NormalCone};

/// A cluster of at most a few hundred triangles, addressed into the flattened buffers of a
/// [`crate::MeshletCollection`].
///
/// Triangles are stored as `3 * triangle_count` meshlet local `u8` indices starting at
/// `triangle_offset`, each indexing into the `vertex_count` vertices starting at `vertex_offset`.
#[derive(Debug, Clone, Copy, bincode::Decode, bincode::Encode, Default, PartialEq)]
pub struct Meshlet {
    pub vertex_offset: u32,
    pub triangle_offset: u32,
    pub vertex_count: u32,
    pub triangle_count: u32,
    pub bounds: BoundingSphere,
    pub cone: NormalCone,
}

impl Meshlet {
    pub fn index_range(&self) -> std::ops::Range<usize> {
        let start = self.triangle_offset as usize;
        start..start + self.triangle_count as usize * 3
    }

    pub fn vertex_range(&self) -> std::ops::Range<usize> {
        let start = self.vertex_offset as usize;
        start..start + self.vertex_count as usize
    }

    /// Resolve the local indices of this meshlet to indices into the flattened vertex buffer.
    pub fn calc_indices_to_vec(&self, local_indices: &[u8], indices: &mut Vec<u32>) {
        for &l in &local_indices[self.index_range()] {
            indices.push(self.vertex_offset + l as u32);
        }
    }

    pub fn calc_indices(&self, local_indices: &[u8]) -> Vec<u32> {
        let mut indices = Vec::with_capacity(self.triangle_count as usize * 3);
        self.calc_indices_to_vec(local_indices, &mut indices);
        indices
    }
}
