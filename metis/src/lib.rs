//! Safe wrapper around the METIS graph partitioner, trimmed to what the meshlet baker needs:
//! weighted k-way partitioning of an undirected graph in CSR form.

mod graph;
mod partition;

pub use graph::CsrGraph;
pub use metis_sys::idx_t;
pub use partition::*;

#[cfg(test)]
pub mod test {
    use super::*;

    /// Two cliques of `size` nodes, heavily weighted internally, joined by a single light edge.
    fn two_cliques(size: usize) -> petgraph::graph::UnGraph<(), idx_t> {
        let mut g = petgraph::Graph::new_undirected();
        let nodes: Vec<_> = (0..size * 2).map(|_| g.add_node(())).collect();

        for clique in 0..2 {
            let base = clique * size;
            for a in 0..size {
                for b in a + 1..size {
                    g.add_edge(nodes[base + a], nodes[base + b], 20);
                }
            }
        }
        g.add_edge(nodes[size - 1], nodes[size], 1);
        g
    }

    #[test]
    fn test_2_node_graph() {
        let mut g = petgraph::Graph::new_undirected();

        let a = g.add_node(());
        let b = g.add_node(());

        g.add_edge(a, b, 1);

        let p = PartitioningConfig::default()
            .partition_from_edge_weighted_graph(2, &g)
            .unwrap();

        assert_ne!(p[0], p[1]);
    }

    #[test]
    fn test_weighted_edges() {
        let g = two_cliques(4);

        let p = PartitioningConfig::default()
            .partition_from_edge_weighted_graph(2, &g)
            .unwrap();

        assert_eq!(p.len(), 8);
        assert!(p[0..4].iter().all(|&x| x == p[0]));
        assert!(p[4..8].iter().all(|&x| x == p[4]));
        assert_ne!(p[0], p[4]);
    }

    #[test]
    fn test_single_partition_skips_metis() {
        let g = two_cliques(3);
        let p = PartitioningConfig::default()
            .partition_from_edge_weighted_graph(1, &g)
            .unwrap();

        assert_eq!(p, vec![0; 6]);
    }

    #[test]
    fn test_edgeless_graph() {
        let graph = CsrGraph::from_raw(vec![0; 7], vec![], vec![]).unwrap();

        let p = PartitioningConfig::default().partition_csr(3, &graph).unwrap();

        assert_eq!(p, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_partition_ids_in_range() {
        let g = two_cliques(6);
        let p = PartitioningConfig {
            rng_seed: Some(7),
            ..Default::default()
        }
        .partition_from_edge_weighted_graph(4, &g)
        .unwrap();

        assert!(p.iter().all(|&x| x < 4));
    }
}
