use crate::{meshlets::MeshletParams, BakeError};

/// When to go back to [`crate::meshlets::SimplifyMode::Normal`] after escalating to sloppy simplification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Escalation {
    /// Every level starts in normal mode
    #[default]
    PerLevel,
    /// Once escalated, every following level stays sloppy
    Sticky,
}

/// Parameters of a bake.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeConfig {
    /// Maximum nodes simplified together into the next level
    pub meshlets_per_group: usize,
    /// Upper bound on simplification attempts, including sloppy retries
    pub max_steps: usize,
    /// 0 for no limit
    pub max_level_count: usize,
    pub target_error: f32,
    pub target_error_sloppy: f32,
    /// A level is kept only if it has fewer than this fraction of the previous level's triangles
    pub min_triangle_reduction_per_step: f32,
    pub simplify_target_ratio: f32,
    /// Smallest error a simplification step may add
    pub min_simplification_error: f32,
    pub bounds_epsilon: f32,
    pub escalation: Escalation,
    pub optimize_vertex_cache: bool,
    /// Node and meshlet budget of the runtime, reported but not enforced
    pub max_lod_nodes: usize,
    pub meshlet: MeshletParams,
    /// Re-check the finished DAG with [`crate::lod::validate::validate_levels`]
    pub validate: bool,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            meshlets_per_group: 4,
            max_steps: 32,
            max_level_count: 0,
            target_error: 0.01,
            target_error_sloppy: 0.001,
            min_triangle_reduction_per_step: 0.8,
            simplify_target_ratio: 0.5,
            min_simplification_error: 1e-4,
            bounds_epsilon: 1e-4,
            escalation: Escalation::PerLevel,
            optimize_vertex_cache: false,
            max_lod_nodes: 128 * 128,
            meshlet: MeshletParams::default(),
            validate: false,
        }
    }
}

impl BakeConfig {
    pub fn validate(&self) -> Result<(), BakeError> {
        let invalid = |msg: String| Err(BakeError::InvalidConfig(msg));

        if self.meshlets_per_group < 2 {
            return invalid(format!(
                "meshlets_per_group must be at least 2, got {}",
                self.meshlets_per_group
            ));
        }
        if !(self.min_triangle_reduction_per_step > 0.0
            && self.min_triangle_reduction_per_step <= 1.0)
        {
            return invalid(format!(
                "min_triangle_reduction_per_step must be in (0, 1], got {}",
                self.min_triangle_reduction_per_step
            ));
        }
        if !(self.simplify_target_ratio > 0.0 && self.simplify_target_ratio < 1.0) {
            return invalid(format!(
                "simplify_target_ratio must be in (0, 1), got {}",
                self.simplify_target_ratio
            ));
        }
        if !(self.min_simplification_error > 0.0) {
            return invalid(format!(
                "min_simplification_error must be positive, got {}",
                self.min_simplification_error
            ));
        }
        if !(self.bounds_epsilon > 0.0) {
            return invalid(format!(
                "bounds_epsilon must be positive, got {}",
                self.bounds_epsilon
            ));
        }
        if !(self.target_error >= 0.0 && self.target_error_sloppy >= 0.0) {
            return invalid("target errors must not be negative".to_owned());
        }

        // meshoptimizer asserts on these
        let MeshletParams {
            max_vertices,
            max_triangles,
            ..
        } = self.meshlet;
        if !(3..=255).contains(&max_vertices) {
            return invalid(format!(
                "max meshlet vertices must be in 3..=255, got {max_vertices}"
            ));
        }
        if !(4..=512).contains(&max_triangles) || max_triangles % 4 != 0 {
            return invalid(format!(
                "max meshlet triangles must be a multiple of 4 in 4..=512, got {max_triangles}"
            ));
        }

        Ok(())
    }
}
