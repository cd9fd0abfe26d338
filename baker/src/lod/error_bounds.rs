//! Error and bounds of simplified nodes, and the back references children keep to their parents.
//!
//! Errors strictly increase and bounds strictly grow from a group to the nodes simplified from it,
//! so a runtime cut chosen by comparing projected errors never shows both a node and its parent.

use common::{BoundingSphere, ROOT_PARENT_ERROR};

use super::LodLevel;
use crate::{BakeConfig, BakeError};

/// Error and bounds shared by every node simplified from one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupParent {
    pub error: f32,
    pub bounds: BoundingSphere,
}

/// Largest error and enclosing bounds of the members of `group`.
pub fn merge_group_source(level: &LodLevel, group: &[usize]) -> (f32, BoundingSphere) {
    let error = group
        .iter()
        .map(|&n| level.nodes[n].error)
        .fold(0.0, f32::max);

    let bounds = BoundingSphere::enclosing(group.iter().map(|&n| &level.nodes[n].bounds));

    (error, bounds)
}

/// Error and bounds of the nodes produced by simplifying group `group` of level `level`.
pub fn group_parent(
    level: usize,
    group: usize,
    source_error: f32,
    source_bounds: &BoundingSphere,
    simplification_error: f32,
    config: &BakeConfig,
) -> Result<GroupParent, BakeError> {
    if !(simplification_error >= 0.0) {
        return Err(BakeError::NegativeSimplificationError {
            level,
            group,
            error: simplification_error,
        });
    }

    let error = source_error + simplification_error.max(config.min_simplification_error);

    if !(error > source_error) {
        return Err(BakeError::NonIncreasingError {
            level,
            group,
            source_error,
            node_error: error,
        });
    }

    Ok(GroupParent {
        error,
        bounds: source_bounds.inflated(config.bounds_epsilon),
    })
}

/// Point every member of each group at the nodes simplified from it.
pub fn assign_parents(level: &mut LodLevel, groups: &[Vec<usize>], parents: &[GroupParent]) {
    for (group, parent) in groups.iter().zip(parents) {
        for &n in group {
            let node = &mut level.nodes[n];
            node.parent_error = parent.error;
            node.parent_bounds = parent.bounds;
        }
    }
}

/// Mark every node of `level` as having no coarser parent.
pub fn seal_root(level: &mut LodLevel) {
    for node in &mut level.nodes {
        node.parent_error = ROOT_PARENT_ERROR;
        node.parent_bounds = BoundingSphere::default();
    }
}

/// Check `error <= parent_error` for every node with a parent.
/// `levels` may be in either order; level indices in the error are positions in `levels`.
pub fn check_monotonic(levels: &[LodLevel]) -> Result<(), BakeError> {
    for (level, l) in levels.iter().enumerate() {
        for (node, n) in l.nodes.iter().enumerate() {
            if n.has_parent() && n.error > n.parent_error {
                return Err(BakeError::NonMonotonicError {
                    level,
                    node,
                    error: n.error,
                    parent_error: n.parent_error,
                });
            }
        }
    }
    Ok(())
}
