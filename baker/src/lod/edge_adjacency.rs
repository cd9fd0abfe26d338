use std::collections::HashSet;

use metis::{idx_t, CsrGraph, PartitioningError};
use rayon::prelude::*;

/// Undirected mesh edge, stored with the smaller vertex first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub a: u32,
    pub b: u32,
}

impl Edge {
    pub fn new(v0: u32, v1: u32) -> Self {
        Self {
            a: v0.min(v1),
            b: v0.max(v1),
        }
    }
}

/// Edges of a triangle list. Degenerate edges are skipped.
pub fn edge_set(indices: &[u32]) -> HashSet<Edge> {
    let mut edges = HashSet::with_capacity(indices.len());

    for tri in indices.chunks_exact(3) {
        for i in 0..3 {
            let (v0, v1) = (tri[i], tri[(i + 1) % 3]);
            if v0 != v1 {
                edges.insert(Edge::new(v0, v1));
            }
        }
    }

    edges
}

/// Edge sets for each node, given each node's triangles.
pub fn node_edge_sets(node_indices: &[Vec<u32>]) -> Vec<HashSet<Edge>> {
    node_indices.par_iter().map(|i| edge_set(i)).collect()
}

pub fn shared_edge_count(a: &HashSet<Edge>, b: &HashSet<Edge>) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|e| large.contains(e)).count()
}

/// Symmetric weighted adjacency between nodes, where the weight is the number of shared edges.
/// Only non zero weights are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyGraph {
    rows: Vec<Vec<(usize, u32)>>,
}

impl AdjacencyGraph {
    /// Compare every pair of edge sets. Each pair is counted once, in parallel, then mirrored.
    pub fn from_edge_sets(edge_sets: &[HashSet<Edge>]) -> Self {
        let upper: Vec<Vec<(usize, u32)>> = (0..edge_sets.len())
            .into_par_iter()
            .map(|i| {
                ((i + 1)..edge_sets.len())
                    .filter_map(|j| {
                        let w = shared_edge_count(&edge_sets[i], &edge_sets[j]);
                        (w > 0).then_some((j, w as u32))
                    })
                    .collect()
            })
            .collect();

        let mut rows = vec![Vec::new(); edge_sets.len()];
        for (i, row) in upper.into_iter().enumerate() {
            for &(j, w) in &row {
                rows[j].push((i, w));
            }
            rows[i].extend(row);
        }
        for row in &mut rows {
            row.sort_unstable();
        }

        Self { rows }
    }

    pub fn from_node_indices(node_indices: &[Vec<u32>]) -> Self {
        Self::from_edge_sets(&node_edge_sets(node_indices))
    }

    pub fn node_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of adjacent node pairs.
    pub fn edge_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn weight(&self, i: usize, j: usize) -> u32 {
        self.rows[i]
            .binary_search_by_key(&j, |&(n, _)| n)
            .map(|k| self.rows[i][k].1)
            .unwrap_or(0)
    }

    pub fn neighbours(&self, i: usize) -> &[(usize, u32)] {
        &self.rows[i]
    }

    pub fn to_csr(&self) -> Result<CsrGraph, PartitioningError> {
        CsrGraph::from_rows(
            self.rows
                .iter()
                .map(|row| row.iter().map(|&(j, w)| (j, w as idx_t))),
        )
    }
}
