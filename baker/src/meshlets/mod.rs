//! Meshlet generation and simplification, the two geometry services the LOD builder calls out to.

mod simplify;

use std::mem;

use common::{BoundingSphere, MeshVert, NormalCone};
use thiserror::Error;

pub use simplify::{MeshSimplifier, MeshoptSimplifier, SimplifyMode, Simplified};

#[derive(Debug, Error, PartialEq)]
pub enum MeshletError {
    #[error("Invalid vertex data: {0}")]
    VertexData(String),
    #[error("Index {index} out of range of {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("Index count {0} is not a multiple of 3")]
    NotTriangles(usize),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshletParams {
    pub max_vertices: usize,
    pub max_triangles: usize,
    pub cone_weight: f32,
}

impl Default for MeshletParams {
    fn default() -> Self {
        Self {
            max_vertices: 128,
            max_triangles: 128,
            cone_weight: 0.25,
        }
    }
}

/// One meshlet within a [`MeshletBuildResult`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeshletDesc {
    /// Offset into [`MeshletBuildResult::vertices`]
    pub vertex_offset: u32,
    pub vertex_count: u32,
    /// Offset into [`MeshletBuildResult::triangles`], in indices
    pub triangle_offset: u32,
    pub triangle_count: u32,
    pub bounds: BoundingSphere,
    pub cone: NormalCone,
}

/// Output of one generate or simplify call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshletBuildResult {
    pub meshlets: Vec<MeshletDesc>,
    /// Meshlet local vertex to source vertex remap
    pub vertices: Vec<u32>,
    /// Meshlet local triangle indices
    pub triangles: Vec<u8>,
}

impl MeshletBuildResult {
    pub fn len(&self) -> usize {
        self.meshlets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshlets.is_empty()
    }

    pub fn local_vertices(&self, meshlet: usize) -> &[u32] {
        let m = &self.meshlets[meshlet];
        let start = m.vertex_offset as usize;
        &self.vertices[start..start + m.vertex_count as usize]
    }

    pub fn local_triangles(&self, meshlet: usize) -> &[u8] {
        let m = &self.meshlets[meshlet];
        let start = m.triangle_offset as usize;
        &self.triangles[start..start + m.triangle_count as usize * 3]
    }

    /// Append the triangles of `meshlet` to `indices` as source vertex indices.
    pub fn meshlet_indices_to_vec(&self, meshlet: usize, indices: &mut Vec<u32>) {
        let verts = self.local_vertices(meshlet);
        for &l in self.local_triangles(meshlet) {
            indices.push(verts[l as usize]);
        }
    }

    pub fn meshlet_indices(&self, meshlet: usize) -> Vec<u32> {
        let mut indices = Vec::with_capacity(self.meshlets[meshlet].triangle_count as usize * 3);
        self.meshlet_indices_to_vec(meshlet, &mut indices);
        indices
    }

    pub fn triangle_count(&self) -> usize {
        self.meshlets.iter().map(|m| m.triangle_count as usize).sum()
    }
}

/// Splits an index buffer into meshlets.
pub trait MeshletGenerator: Sync {
    fn generate(&self, indices: &[u32]) -> Result<MeshletBuildResult, MeshletError>;
}

pub(crate) fn vertex_adapter(
    verts: &[MeshVert],
) -> Result<meshopt::VertexDataAdapter<'_>, MeshletError> {
    meshopt::VertexDataAdapter::new(bytemuck::cast_slice(verts), mem::size_of::<MeshVert>(), 0)
        .map_err(|e| MeshletError::VertexData(format!("{e:?}")))
}

pub(crate) fn check_indices(indices: &[u32], vertex_count: usize) -> Result<(), MeshletError> {
    if indices.len() % 3 != 0 {
        return Err(MeshletError::NotTriangles(indices.len()));
    }
    match indices.iter().find(|&&i| i as usize >= vertex_count) {
        Some(&index) => Err(MeshletError::IndexOutOfRange {
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

/// [`MeshletGenerator`] over a fixed vertex buffer, backed by meshoptimizer.
#[derive(Clone, Copy)]
pub struct MeshoptMeshletGenerator<'a> {
    verts: &'a [MeshVert],
    params: MeshletParams,
}

impl<'a> MeshoptMeshletGenerator<'a> {
    pub fn new(verts: &'a [MeshVert], params: MeshletParams) -> Self {
        Self { verts, params }
    }

    pub fn verts(&self) -> &'a [MeshVert] {
        self.verts
    }
}

impl MeshletGenerator for MeshoptMeshletGenerator<'_> {
    fn generate(&self, indices: &[u32]) -> Result<MeshletBuildResult, MeshletError> {
        check_indices(indices, self.verts.len())?;

        if indices.is_empty() {
            return Ok(MeshletBuildResult::default());
        }

        let adapter = vertex_adapter(self.verts)?;

        let meshlets = meshopt::build_meshlets(
            indices,
            &adapter,
            self.params.max_vertices,
            self.params.max_triangles,
            self.params.cone_weight,
        );

        let descs = meshlets
            .meshlets
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let bounds = meshopt::compute_meshlet_bounds(meshlets.get(i), &adapter);

                MeshletDesc {
                    vertex_offset: m.vertex_offset,
                    vertex_count: m.vertex_count,
                    triangle_offset: m.triangle_offset,
                    triangle_count: m.triangle_count,
                    bounds: BoundingSphere::new(bounds.center.into(), bounds.radius),
                    cone: NormalCone::new(
                        bounds.cone_apex.into(),
                        bounds.cone_axis.into(),
                        bounds.cone_cutoff,
                    ),
                }
            })
            .collect();

        Ok(MeshletBuildResult {
            meshlets: descs,
            vertices: meshlets.vertices,
            triangles: meshlets.triangles,
        })
    }
}
