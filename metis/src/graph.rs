use crate::PartitioningError;
use metis_sys::idx_t;

/// Undirected, edge weighted graph in the compressed sparse row layout METIS consumes.
/// Every edge is stored twice, once from each endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CsrGraph {
    adjacency_idx: Vec<idx_t>,
    adjacency: Vec<idx_t>,
    adjacency_weight: Vec<idx_t>,
}

impl CsrGraph {
    /// Wrap raw CSR arrays, checking the layout is one METIS will accept.
    pub fn from_raw(
        adjacency_idx: Vec<idx_t>,
        adjacency: Vec<idx_t>,
        adjacency_weight: Vec<idx_t>,
    ) -> Result<Self, PartitioningError> {
        if adjacency_weight.len() != adjacency.len() {
            return Err(PartitioningError::WeightsMismatch);
        }
        let Some(&last) = adjacency_idx.last() else {
            return Err(PartitioningError::InvalidGraph(
                "adjacency index must have at least one entry".to_owned(),
            ));
        };
        if adjacency_idx[0] != 0 || last as usize != adjacency.len() {
            return Err(PartitioningError::InvalidGraph(format!(
                "adjacency index spans {}..{}, expected 0..{}",
                adjacency_idx[0],
                last,
                adjacency.len()
            )));
        }
        if adjacency_idx.windows(2).any(|w| w[0] > w[1]) {
            return Err(PartitioningError::InvalidGraph(
                "adjacency index is not monotonic".to_owned(),
            ));
        }

        let nodes = adjacency_idx.len() - 1;

        for v in 0..nodes {
            let row = adjacency_idx[v] as usize..adjacency_idx[v + 1] as usize;
            for &u in &adjacency[row] {
                if u < 0 || u as usize >= nodes || u as usize == v {
                    return Err(PartitioningError::InvalidGraph(format!(
                        "node {v} has invalid neighbour {u}"
                    )));
                }
            }
        }

        Ok(Self {
            adjacency_idx,
            adjacency,
            adjacency_weight,
        })
    }

    /// Build from one row of `(neighbour, weight)` pairs per node.
    pub fn from_rows<R>(rows: impl IntoIterator<Item = R>) -> Result<Self, PartitioningError>
    where
        R: IntoIterator<Item = (usize, idx_t)>,
    {
        let mut adjacency_idx = vec![0];
        let mut adjacency = Vec::new();
        let mut adjacency_weight = Vec::new();

        for row in rows {
            for (u, w) in row {
                adjacency.push(u as idx_t);
                adjacency_weight.push(w);
            }
            adjacency_idx.push(adjacency.len() as idx_t);
        }

        Self::from_raw(adjacency_idx, adjacency, adjacency_weight)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency_idx.len() - 1
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.len() / 2
    }

    pub fn neighbours(&self, v: usize) -> impl Iterator<Item = (usize, idx_t)> + '_ {
        let row = self.adjacency_idx[v] as usize..self.adjacency_idx[v + 1] as usize;

        self.adjacency[row.clone()]
            .iter()
            .zip(&self.adjacency_weight[row])
            .map(|(&u, &w)| (u as usize, w))
    }

    pub fn adjacency_idx(&self) -> &[idx_t] {
        &self.adjacency_idx
    }

    pub fn adjacency(&self) -> &[idx_t] {
        &self.adjacency
    }

    pub fn adjacency_weight(&self) -> &[idx_t] {
        &self.adjacency_weight
    }
}
