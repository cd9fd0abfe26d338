use metis::{CsrGraph, PartitioningError};

use super::edge_adjacency::AdjacencyGraph;
use crate::BakeError;

/// Balanced min-cut partitioning of a weighted graph.
pub trait GraphPartitioner: Sync {
    /// Returns the part of each node of `graph`, in `0..parts`.
    fn partition(&self, graph: &CsrGraph, parts: u32) -> Result<Vec<u32>, PartitioningError>;
}

impl GraphPartitioner for metis::PartitioningConfig {
    fn partition(&self, graph: &CsrGraph, parts: u32) -> Result<Vec<u32>, PartitioningError> {
        self.partition_csr(parts, graph)
    }
}

/// Partitions requested for `nodes` nodes. One slot per group is left spare
/// so an unevenly balanced partitioning still fits.
pub fn partition_count(nodes: usize, meshlets_per_group: usize) -> usize {
    nodes.div_ceil(meshlets_per_group - 1)
}

/// Consecutive runs of at most `meshlets_per_group` nodes.
pub fn trivial_groups(nodes: usize, meshlets_per_group: usize) -> Vec<Vec<usize>> {
    (0..nodes)
        .step_by(meshlets_per_group)
        .map(|start| (start..nodes.min(start + meshlets_per_group)).collect())
        .collect()
}

/// Split the nodes of `adjacency` into groups of at most `meshlets_per_group`,
/// keeping nodes that share many edges together.
pub fn group_nodes(
    adjacency: &AdjacencyGraph,
    meshlets_per_group: usize,
    partitioner: &dyn GraphPartitioner,
    level: usize,
) -> Result<Vec<Vec<usize>>, BakeError> {
    let nodes = adjacency.node_count();
    let parts = partition_count(nodes, meshlets_per_group);

    if parts <= 1 {
        return Ok(vec![(0..nodes).collect()]);
    }

    let graph = adjacency
        .to_csr()
        .map_err(|source| BakeError::Partitioning { level, source })?;

    log::debug!(
        "Partitioning {nodes} nodes with {} shared boundaries into {parts} groups",
        graph.edge_count()
    );

    let partitioning = partitioner
        .partition(&graph, parts as u32)
        .map_err(|source| BakeError::Partitioning { level, source })?;

    if partitioning.len() != nodes {
        log::error!(
            "Partitioner returned {} parts for {nodes} nodes",
            partitioning.len()
        );
        return Err(BakeError::Partitioning {
            level,
            source: PartitioningError::Other,
        });
    }

    groups_from_partitioning(&partitioning, parts, meshlets_per_group, level)
}

/// Place each node into the first free slot of its partition's group.
/// Empty partitions are dropped, so group ids are dense.
pub fn groups_from_partitioning(
    partitioning: &[u32],
    parts: usize,
    meshlets_per_group: usize,
    level: usize,
) -> Result<Vec<Vec<usize>>, BakeError> {
    let mut groups = vec![Vec::with_capacity(meshlets_per_group); parts];

    for (node, &partition) in partitioning.iter().enumerate() {
        let group = groups
            .get_mut(partition as usize)
            .ok_or(BakeError::PartitionOutOfRange {
                level,
                node,
                partition,
                partition_count: parts as u32,
            })?;

        if group.len() == meshlets_per_group {
            return Err(BakeError::GroupOverflow {
                level,
                partition,
                node,
                capacity: meshlets_per_group,
            });
        }
        group.push(node);
    }

    groups.retain(|g| !g.is_empty());

    Ok(groups)
}

#[cfg(test)]
mod test {
    use super::*;

    struct Fixed(Vec<u32>);

    impl GraphPartitioner for Fixed {
        fn partition(&self, _: &CsrGraph, _: u32) -> Result<Vec<u32>, PartitioningError> {
            Ok(self.0.clone())
        }
    }

    fn strip(nodes: u32) -> AdjacencyGraph {
        // A triangle strip, each triangle its own node
        let tris: Vec<_> = (0..nodes).map(|i| vec![i, i + 1, i + 2]).collect();
        AdjacencyGraph::from_node_indices(&tris)
    }

    #[test]
    fn test_partition_count() {
        assert_eq!(partition_count(3, 4), 1);
        assert_eq!(partition_count(4, 4), 2);
        assert_eq!(partition_count(7, 4), 3);
    }

    #[test]
    fn test_small_level_skips_partitioner() {
        // Would fail if called
        let groups = group_nodes(&strip(3), 4, &Fixed(vec![]), 0).unwrap();

        assert_eq!(groups, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_slots_filled_in_node_order() {
        let groups = groups_from_partitioning(&[1, 0, 1, 0, 1], 2, 4, 0).unwrap();

        assert_eq!(groups, vec![vec![1, 3], vec![0, 2, 4]]);
    }

    #[test]
    fn test_empty_partitions_dropped() {
        let groups = groups_from_partitioning(&[2, 2, 0], 3, 4, 0).unwrap();

        assert_eq!(groups, vec![vec![2], vec![0, 1]]);
    }

    #[test]
    fn test_overflow_is_fatal() {
        let err = group_nodes(&strip(5), 4, &Fixed(vec![0; 5]), 3).unwrap_err();

        assert!(matches!(
            err,
            BakeError::GroupOverflow {
                level: 3,
                partition: 0,
                node: 4,
                capacity: 4
            }
        ));
    }

    #[test]
    fn test_out_of_range_is_fatal() {
        let err = group_nodes(&strip(5), 4, &Fixed(vec![0, 1, 2, 0, 1]), 0).unwrap_err();

        assert!(matches!(
            err,
            BakeError::PartitionOutOfRange {
                node: 2,
                partition: 2,
                partition_count: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_trivial_groups() {
        assert_eq!(trivial_groups(3, 4), vec![vec![0, 1, 2]]);
        assert_eq!(
            trivial_groups(9, 4),
            vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8]]
        );
        assert!(trivial_groups(0, 4).is_empty());
    }

    #[test]
    fn test_metis_groups_strip() {
        let adjacency = strip(12);

        let groups = group_nodes(&adjacency, 4, &metis::PartitioningConfig::default(), 0).unwrap();

        let mut seen: Vec<usize> = groups.iter().flatten().copied().collect();
        seen.sort();
        assert_eq!(seen, (0..12).collect::<Vec<_>>());
        assert!(groups.iter().all(|g| !g.is_empty() && g.len() <= 4));
    }
}
