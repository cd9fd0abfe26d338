use rayon::prelude::*;

use super::{
    cluster_partition::{group_nodes, trivial_groups, GraphPartitioner},
    edge_adjacency::AdjacencyGraph,
    error_bounds::{self, GroupParent},
    LodLevel, LodNode, MeshletRef,
};
use crate::{
    meshlets::{MeshSimplifier, MeshletError, SimplifyMode},
    BakeConfig, BakeError, Escalation,
};

/// Why the level loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SingleNode,
    MaxSteps,
    InsufficientReduction,
}

/// Result of simplifying every group of a level once.
struct Candidate {
    level: LodLevel,
    parents: Vec<GroupParent>,
}

/// Builds the LOD levels above a leaf level.
pub struct LevelBuilder<'a> {
    config: &'a BakeConfig,
    simplifier: &'a dyn MeshSimplifier,
    partitioner: &'a dyn GraphPartitioner,
}

impl<'a> LevelBuilder<'a> {
    pub fn new(
        config: &'a BakeConfig,
        simplifier: &'a dyn MeshSimplifier,
        partitioner: &'a dyn GraphPartitioner,
    ) -> Self {
        Self {
            config,
            simplifier,
            partitioner,
        }
    }

    /// Build every level from `leaf` and order them coarsest first, ready to flatten.
    pub fn build(&self, leaf: LodLevel) -> Result<Vec<LodLevel>, BakeError> {
        let mut levels = vec![leaf];

        let stop = self.build_chain(&mut levels)?;

        log::info!("Built {} levels, stopped by {stop:?}", levels.len());

        self.finish(levels)
    }

    /// Simplify level after level onto `levels`, finest first.
    pub fn build_chain(&self, levels: &mut Vec<LodLevel>) -> Result<StopReason, BakeError> {
        let mut mode = SimplifyMode::Normal;
        let mut steps = 0;
        // Groups of the current level, kept across a sloppy retry
        let mut groups: Option<Vec<Vec<usize>>> = None;

        loop {
            let level_index = levels.len() - 1;
            let current = &levels[level_index];

            if current.node_count() <= 1 {
                return Ok(StopReason::SingleNode);
            }
            if steps >= self.config.max_steps {
                log::warn!(
                    "Stopping after {steps} steps with {} nodes remaining",
                    current.node_count()
                );
                return Ok(StopReason::MaxSteps);
            }
            steps += 1;

            let level_groups = match groups.take() {
                Some(g) => g,
                None => self.group_level(current, level_index)?,
            };

            let target_error = match mode {
                SimplifyMode::Normal => self.config.target_error,
                SimplifyMode::Sloppy => self.config.target_error_sloppy,
            };

            let candidate =
                self.simplify_groups(current, level_index, &level_groups, target_error, mode)?;

            let required = current.triangle_count as f32 * self.config.min_triangle_reduction_per_step;

            if (candidate.level.triangle_count as f32) < required {
                log::info!(
                    "Level {}: {} nodes, {} triangles from {} groups ({mode:?})",
                    level_index + 1,
                    candidate.level.node_count(),
                    candidate.level.triangle_count,
                    level_groups.len()
                );

                let current = &mut levels[level_index];
                error_bounds::assign_parents(current, &level_groups, &candidate.parents);
                current.groups = Some(level_groups);
                levels.push(candidate.level);

                if self.config.escalation == Escalation::PerLevel {
                    mode = SimplifyMode::Normal;
                }
            } else if mode == SimplifyMode::Normal {
                log::warn!(
                    "Level {} only reduced {} to {} triangles, retrying with sloppy simplification",
                    level_index + 1,
                    current.triangle_count,
                    candidate.level.triangle_count
                );
                mode = SimplifyMode::Sloppy;
                groups = Some(level_groups);
            } else {
                log::warn!(
                    "Level {} only reduced {} to {} triangles with sloppy simplification, stopping",
                    level_index + 1,
                    current.triangle_count,
                    candidate.level.triangle_count
                );
                // The partitioned groups still order the coarsest level
                levels[level_index].groups = Some(level_groups);
                return Ok(StopReason::InsufficientReduction);
            }
        }
    }

    fn group_level(
        &self,
        level: &LodLevel,
        level_index: usize,
    ) -> Result<Vec<Vec<usize>>, BakeError> {
        let node_indices: Vec<Vec<u32>> = (0..level.node_count())
            .into_par_iter()
            .map(|n| level.node_indices(n))
            .collect();

        let adjacency = AdjacencyGraph::from_node_indices(&node_indices);

        let groups = group_nodes(
            &adjacency,
            self.config.meshlets_per_group,
            self.partitioner,
            level_index,
        )?;

        log::debug!(
            "Level {level_index}: {} nodes in {} groups",
            level.node_count(),
            groups.len()
        );

        Ok(groups)
    }

    /// Simplify each group of `level` into the nodes of a candidate next level.
    /// Nothing is written to `level`; parents are only assigned if the candidate is kept.
    fn simplify_groups(
        &self,
        level: &LodLevel,
        level_index: usize,
        groups: &[Vec<usize>],
        target_error: f32,
        mode: SimplifyMode,
    ) -> Result<Candidate, BakeError> {
        let results = groups
            .par_iter()
            .enumerate()
            .map(|(group_index, group)| {
                let mut merged = Vec::new();
                for &n in group {
                    level.node_indices_to_vec(n, &mut merged);
                }

                let (source_error, source_bounds) = error_bounds::merge_group_source(level, group);

                let simplified = self
                    .simplifier
                    .simplify(&merged, target_error, mode)
                    .map_err(|source| BakeError::Meshlets {
                        level: level_index,
                        source,
                    })?;

                if simplified.meshlets.is_empty() {
                    return Err(BakeError::Meshlets {
                        level: level_index,
                        source: MeshletError::Other(format!(
                            "group {group_index} simplified to nothing"
                        )),
                    });
                }

                let parent = error_bounds::group_parent(
                    level_index,
                    group_index,
                    source_error,
                    &source_bounds,
                    simplified.error,
                    self.config,
                )?;

                Ok((simplified.meshlets, parent))
            })
            .collect::<Result<Vec<_>, BakeError>>()?;

        let mut next = LodLevel::default();
        let mut parents = Vec::with_capacity(results.len());

        for (group_index, (build, parent)) in results.into_iter().enumerate() {
            for meshlet in 0..build.len() {
                next.nodes.push(LodNode::new(
                    MeshletRef {
                        build: next.builds.len(),
                        meshlet,
                    },
                    Some(group_index),
                    parent.error,
                    parent.bounds,
                ));
            }
            next.triangle_count += build.triangle_count();
            next.builds.push(build);
            parents.push(parent);
        }

        Ok(Candidate {
            level: next,
            parents,
        })
    }

    /// Reverse into coarsest first order, apply the level cap, and fill in groups and root markers.
    fn finish(&self, mut levels: Vec<LodLevel>) -> Result<Vec<LodLevel>, BakeError> {
        error_bounds::check_monotonic(&levels)?;

        levels.reverse();

        let cap = self.config.max_level_count;
        if cap > 0 && levels.len() > cap {
            log::info!("Dropping {} coarsest levels", levels.len() - cap);
            levels.drain(..levels.len() - cap);
        }

        for level in &mut levels {
            if level.groups.is_none() {
                level.groups = Some(trivial_groups(
                    level.node_count(),
                    self.config.meshlets_per_group,
                ));
            }
        }

        if let Some(root) = levels.first_mut() {
            error_bounds::seal_root(root);
        }

        for (i, level) in levels.iter_mut().enumerate() {
            for node in &mut level.nodes {
                node.level = i;
            }
        }

        Ok(levels)
    }
}
