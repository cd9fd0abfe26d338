//! Structural checks over a finished set of levels, coarsest first.

use petgraph::{algo::toposort, graph::NodeIndex, visit::Dfs, Graph};
use thiserror::Error;

use super::LodLevel;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationIssue {
    #[error("Level {level} node {node} has error {error} above its parent error {parent_error}")]
    NonMonotonicError {
        level: usize,
        node: usize,
        error: f32,
        parent_error: f32,
    },
    #[error("Level {level} node {node} bounds are not contained by its parent bounds")]
    BoundsNotContained { level: usize, node: usize },
    #[error("Level {level} group {group} has {size} nodes, expected 1 to {max}")]
    GroupSize {
        level: usize,
        group: usize,
        size: usize,
        max: usize,
    },
    #[error("Level {level} node {node} appears in {count} groups")]
    NodeGrouping {
        level: usize,
        node: usize,
        count: usize,
    },
    #[error("Level {level} has {triangles} triangles, more than the {finer} of the level below")]
    TriangleOrder {
        level: usize,
        triangles: usize,
        finer: usize,
    },
    #[error("Level {level} node {node} references missing child group {group}")]
    ChildGroupOutOfRange {
        level: usize,
        node: usize,
        group: usize,
    },
    #[error("Level {level} node {node} was not built from a finer group")]
    MissingChildGroup { level: usize, node: usize },
    #[error("Level {level} group {group} was never simplified into a parent")]
    OrphanGroup { level: usize, group: usize },
    #[error("Level {level} node {node} parent data does not match the nodes built from its group")]
    ParentMismatch { level: usize, node: usize },
    #[error("Root level node {node} has parent error {parent_error}")]
    RootParent { node: usize, parent_error: f32 },
    #[error("Level {level} node {node} has no parent")]
    MissingParent { level: usize, node: usize },
    #[error("Node graph contains a cycle")]
    Cycle,
    #[error("Level {level} node {node} cannot be reached from the root")]
    Unreachable { level: usize, node: usize },
}

fn tolerance(radius: f32) -> f32 {
    1e-5 * radius.max(1.0)
}

/// Check a built DAG, returning every problem found. An empty result means the levels are sound.
pub fn validate_levels(levels: &[LodLevel], meshlets_per_group: usize) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (level, l) in levels.iter().enumerate() {
        check_groups(level, l, meshlets_per_group, &mut issues);
        check_nodes(level, l, &mut issues);

        if let Some(finer) = levels.get(level + 1) {
            if l.triangle_count > finer.triangle_count {
                issues.push(ValidationIssue::TriangleOrder {
                    level,
                    triangles: l.triangle_count,
                    finer: finer.triangle_count,
                });
            }
            check_links(level, l, finer, &mut issues);
        }
    }

    check_graph(levels, &mut issues);

    if !issues.is_empty() {
        log::warn!("Validation found {} issues", issues.len());
    }

    issues
}

fn check_groups(
    level: usize,
    l: &LodLevel,
    meshlets_per_group: usize,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut membership = vec![0; l.node_count()];

    for (group, members) in l.groups().iter().enumerate() {
        if members.is_empty() || members.len() > meshlets_per_group {
            issues.push(ValidationIssue::GroupSize {
                level,
                group,
                size: members.len(),
                max: meshlets_per_group,
            });
        }
        for &n in members {
            match membership.get_mut(n) {
                Some(count) => *count += 1,
                None => issues.push(ValidationIssue::NodeGrouping {
                    level,
                    node: n,
                    count: 0,
                }),
            }
        }
    }

    for (node, &count) in membership.iter().enumerate() {
        if count != 1 {
            issues.push(ValidationIssue::NodeGrouping { level, node, count });
        }
    }
}

fn check_nodes(level: usize, l: &LodLevel, issues: &mut Vec<ValidationIssue>) {
    for (node, n) in l.nodes.iter().enumerate() {
        if level == 0 {
            if n.has_parent() {
                issues.push(ValidationIssue::RootParent {
                    node,
                    parent_error: n.parent_error,
                });
            }
            continue;
        }

        if !n.has_parent() {
            issues.push(ValidationIssue::MissingParent { level, node });
            continue;
        }

        if n.error > n.parent_error {
            issues.push(ValidationIssue::NonMonotonicError {
                level,
                node,
                error: n.error,
                parent_error: n.parent_error,
            });
        }

        if !n
            .parent_bounds
            .contains_sphere(&n.bounds, tolerance(n.parent_bounds.radius()))
        {
            issues.push(ValidationIssue::BoundsNotContained { level, node });
        }
    }
}

/// Compare the parent data stored on each group of `finer` with the nodes of `l` built from it.
fn check_links(level: usize, l: &LodLevel, finer: &LodLevel, issues: &mut Vec<ValidationIssue>) {
    let groups = finer.groups();
    let mut parents = vec![None; groups.len()];

    for (node, n) in l.nodes.iter().enumerate() {
        match n.child_group {
            Some(group) if group < groups.len() => parents[group] = Some(node),
            Some(group) => {
                issues.push(ValidationIssue::ChildGroupOutOfRange { level, node, group })
            }
            None => issues.push(ValidationIssue::MissingChildGroup { level, node }),
        }
    }

    for (group, (members, parent)) in groups.iter().zip(&parents).enumerate() {
        let Some(parent) = parent else {
            issues.push(ValidationIssue::OrphanGroup {
                level: level + 1,
                group,
            });
            continue;
        };
        let parent = &l.nodes[*parent];

        for &c in members {
            let Some(child) = finer.nodes.get(c) else {
                continue;
            };
            if child.parent_error != parent.error || child.parent_bounds != parent.bounds {
                issues.push(ValidationIssue::ParentMismatch {
                    level: level + 1,
                    node: c,
                });
            }
        }
    }
}

/// Build the node graph, parents pointing at the children they replace, and check it is a
/// single rooted DAG.
fn check_graph(levels: &[LodLevel], issues: &mut Vec<ValidationIssue>) {
    let mut graph = Graph::<(usize, usize), ()>::new();

    let indices: Vec<Vec<NodeIndex>> = levels
        .iter()
        .enumerate()
        .map(|(level, l)| {
            (0..l.node_count())
                .map(|node| graph.add_node((level, node)))
                .collect()
        })
        .collect();

    for (level, l) in levels.iter().enumerate() {
        let Some(finer) = levels.get(level + 1) else {
            continue;
        };
        let groups = finer.groups();

        for (node, n) in l.nodes.iter().enumerate() {
            let Some(members) = n.child_group.and_then(|g| groups.get(g)) else {
                continue;
            };
            for &c in members {
                if let Some(&child) = indices[level + 1].get(c) {
                    graph.add_edge(indices[level][node], child, ());
                }
            }
        }
    }

    if toposort(&graph, None).is_err() {
        issues.push(ValidationIssue::Cycle);
    }

    let Some(roots) = indices.first() else {
        return;
    };

    let mut dfs = Dfs::empty(&graph);
    for &root in roots {
        dfs.move_to(root);
        while dfs.next(&graph).is_some() {}
    }

    for (level, nodes) in indices.iter().enumerate() {
        for (node, &index) in nodes.iter().enumerate() {
            if !dfs.discovered.contains(index.index()) {
                issues.push(ValidationIssue::Unreachable { level, node });
            }
        }
    }
}
