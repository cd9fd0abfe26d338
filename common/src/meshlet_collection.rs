use bincode::{Decode, Encode};

use crate::{asset, BoundingSphere, MeshVert, Meshlet};

/// Value of [`MeshLodNode::parent_error`] for nodes with no coarser parent.
pub const ROOT_PARENT_ERROR: f32 = -1.0;

/// One node of the flattened LOD DAG.
#[derive(Debug, Clone, Copy, Decode, Encode, PartialEq, Default)]
pub struct MeshLodNode {
    /// Bounds of this node's own geometry, grown to enclose its children.
    pub bounds: BoundingSphere,
    pub parent_bounds: BoundingSphere,
    /// [`ROOT_PARENT_ERROR`] for nodes in the coarsest level
    pub parent_error: f32,
    pub error: f32,
    pub meshlet_start: u32,
    pub meshlet_count: u32,
    /// 0 is the coarsest level
    pub level: u32,
}

impl MeshLodNode {
    pub fn is_root(&self) -> bool {
        self.parent_error < 0.0
    }
}

/// Baked multi-resolution mesh, ready for upload.
/// Nodes are stored level by level, coarsest first.
#[derive(Debug, Clone, Decode, Encode, PartialEq, Default)]
pub struct MeshletCollection {
    pub name: String,
    pub aabb_min: [f32; 3],
    pub aabb_max: [f32; 3],
    pub level_count: u32,
    /// Meshlets generated directly from the source mesh
    pub leaf_meshlet_count: u32,
    /// Number of nodes in each level, in level order
    pub level_node_counts: Vec<u32>,
    pub nodes: Vec<MeshLodNode>,
    pub meshlets: Vec<Meshlet>,
    pub vertices: Vec<MeshVert>,
    pub indices: Vec<u8>,
}

impl asset::Asset for MeshletCollection {}

impl MeshletCollection {
    /// Nodes of level `level`, or an empty slice if there is no such level.
    pub fn level_nodes(&self, level: usize) -> &[MeshLodNode] {
        if level >= self.level_node_counts.len() {
            return &[];
        }
        let start: usize = self.level_node_counts[..level]
            .iter()
            .map(|&c| c as usize)
            .sum();
        &self.nodes[start..start + self.level_node_counts[level] as usize]
    }

    pub fn node_meshlets(&self, node: &MeshLodNode) -> &[Meshlet] {
        let start = node.meshlet_start as usize;
        &self.meshlets[start..start + node.meshlet_count as usize]
    }

    pub fn level_triangle_count(&self, level: usize) -> usize {
        self.level_nodes(level)
            .iter()
            .flat_map(|n| self.node_meshlets(n))
            .map(|m| m.triangle_count as usize)
            .sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshlets.iter().map(|m| m.triangle_count as usize).sum()
    }

    pub fn aabb(&self) -> (glam::Vec3, glam::Vec3) {
        (self.aabb_min.into(), self.aabb_max.into())
    }
}
