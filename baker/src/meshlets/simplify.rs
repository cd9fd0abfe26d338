use common::MeshVert;

use super::{
    check_indices, vertex_adapter, MeshletBuildResult, MeshletError, MeshletGenerator,
    MeshletParams, MeshoptMeshletGenerator,
};

/// How hard to push a simplification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimplifyMode {
    /// Topology preserving edge collapse, with the group border locked
    #[default]
    Normal,
    /// Vertex clustering, ignores topology and borders but always reduces
    Sloppy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Simplified {
    pub meshlets: MeshletBuildResult,
    /// Object space error introduced, never negative for a well behaved simplifier
    pub error: f32,
}

/// Reduces a merged group of meshlets and re-clusters the result.
pub trait MeshSimplifier: Sync {
    fn simplify(
        &self,
        indices: &[u32],
        target_error: f32,
        mode: SimplifyMode,
    ) -> Result<Simplified, MeshletError>;
}

/// [`MeshSimplifier`] over a fixed vertex buffer, backed by meshoptimizer.
#[derive(Clone, Copy)]
pub struct MeshoptSimplifier<'a> {
    generator: MeshoptMeshletGenerator<'a>,
    /// Fraction of the input indices to aim for
    target_ratio: f32,
}

impl<'a> MeshoptSimplifier<'a> {
    pub fn new(verts: &'a [MeshVert], params: MeshletParams, target_ratio: f32) -> Self {
        Self {
            generator: MeshoptMeshletGenerator::new(verts, params),
            target_ratio,
        }
    }
}

impl MeshSimplifier for MeshoptSimplifier<'_> {
    fn simplify(
        &self,
        indices: &[u32],
        target_error: f32,
        mode: SimplifyMode,
    ) -> Result<Simplified, MeshletError> {
        let verts = self.generator.verts();
        check_indices(indices, verts.len())?;

        if indices.is_empty() {
            return Ok(Simplified {
                meshlets: MeshletBuildResult::default(),
                error: 0.0,
            });
        }

        let adapter = vertex_adapter(verts)?;

        let target_count = ((indices.len() as f32 * self.target_ratio) as usize / 3) * 3;
        let mut relative_error = 0.0;

        let simplified = match mode {
            SimplifyMode::Normal => meshopt::simplify(
                indices,
                &adapter,
                target_count,
                target_error,
                meshopt::SimplifyOptions::LockBorder,
                Some(&mut relative_error),
            ),
            SimplifyMode::Sloppy => meshopt::simplify_sloppy(
                indices,
                &adapter,
                target_count,
                target_error,
                Some(&mut relative_error),
            ),
        };

        log::trace!(
            "{mode:?} simplify {} -> {} indices, relative error {relative_error}",
            indices.len(),
            simplified.len()
        );

        // Collapsing a group to nothing would leave holes, keep it as it was
        let (simplified, error) = if simplified.is_empty() {
            (indices.to_vec(), 0.0)
        } else {
            (
                simplified,
                relative_error * meshopt::simplify_scale(&adapter),
            )
        };

        Ok(Simplified {
            meshlets: self.generator.generate(&simplified)?,
            error,
        })
    }
}
