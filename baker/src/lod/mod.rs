//! The LOD DAG: levels of meshlet nodes, each coarser level simplified from groups of the finer one.

pub mod cluster_partition;
pub mod edge_adjacency;
pub mod error_bounds;
pub mod flatten;
pub mod level_builder;
pub mod validate;

use common::{BoundingSphere, ROOT_PARENT_ERROR};

use crate::meshlets::{MeshletBuildResult, MeshletDesc};

/// Location of a node's meshlet within its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshletRef {
    /// Index into [`LodLevel::builds`]
    pub build: usize,
    pub meshlet: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LodNode {
    pub meshlet: MeshletRef,
    /// Index of the containing level, 0 being the coarsest once the build completes
    pub level: usize,
    /// Group of the next finer level this node was simplified from. `None` for leaves
    pub child_group: Option<usize>,
    pub error: f32,
    pub bounds: BoundingSphere,
    /// Error of the coarser nodes that replace this one, [`ROOT_PARENT_ERROR`] if there are none
    pub parent_error: f32,
    pub parent_bounds: BoundingSphere,
}

impl LodNode {
    pub fn new(
        meshlet: MeshletRef,
        child_group: Option<usize>,
        error: f32,
        bounds: BoundingSphere,
    ) -> Self {
        Self {
            meshlet,
            level: 0,
            child_group,
            error,
            bounds,
            parent_error: ROOT_PARENT_ERROR,
            parent_bounds: BoundingSphere::default(),
        }
    }

    pub fn has_parent(&self) -> bool {
        self.parent_error >= 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LodLevel {
    pub nodes: Vec<LodNode>,
    pub builds: Vec<MeshletBuildResult>,
    /// Groups of nodes, each simplified together into the next coarser level if there is one.
    /// `None` until assigned.
    pub groups: Option<Vec<Vec<usize>>>,
    pub triangle_count: usize,
}

impl LodLevel {
    /// One node per meshlet of `build`, with no error.
    pub fn leaf(build: MeshletBuildResult) -> Self {
        let nodes = build
            .meshlets
            .iter()
            .enumerate()
            .map(|(meshlet, m)| LodNode::new(MeshletRef { build: 0, meshlet }, None, 0.0, m.bounds))
            .collect();

        Self {
            nodes,
            triangle_count: build.triangle_count(),
            builds: vec![build],
            groups: None,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        self.groups.as_deref().unwrap_or_default()
    }

    pub fn meshlet(&self, r: MeshletRef) -> &MeshletDesc {
        &self.builds[r.build].meshlets[r.meshlet]
    }

    pub fn node_meshlet(&self, node: usize) -> &MeshletDesc {
        self.meshlet(self.nodes[node].meshlet)
    }

    /// Append the triangles of `node` as source vertex indices.
    pub fn node_indices_to_vec(&self, node: usize, indices: &mut Vec<u32>) {
        let r = self.nodes[node].meshlet;
        self.builds[r.build].meshlet_indices_to_vec(r.meshlet, indices)
    }

    pub fn node_indices(&self, node: usize) -> Vec<u32> {
        let r = self.nodes[node].meshlet;
        self.builds[r.build].meshlet_indices(r.meshlet)
    }

    pub fn node_triangle_count(&self, node: usize) -> usize {
        self.node_meshlet(node).triangle_count as usize
    }
}
