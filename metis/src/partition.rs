use crate::CsrGraph;
use metis_sys::{
    idx_t, mctype_et_METIS_CTYPE_RM, mctype_et_METIS_CTYPE_SHEM, miptype_et_METIS_IPTYPE_GROW,
    miptype_et_METIS_IPTYPE_RANDOM, mobjtype_et_METIS_OBJTYPE_CUT, mobjtype_et_METIS_OBJTYPE_VOL,
    moptions_et_METIS_OPTION_CONTIG, moptions_et_METIS_OPTION_CTYPE,
    moptions_et_METIS_OPTION_IPTYPE, moptions_et_METIS_OPTION_MINCONN,
    moptions_et_METIS_OPTION_NCUTS, moptions_et_METIS_OPTION_NITER,
    moptions_et_METIS_OPTION_NO2HOP, moptions_et_METIS_OPTION_OBJTYPE,
    moptions_et_METIS_OPTION_RTYPE, moptions_et_METIS_OPTION_SEED,
    moptions_et_METIS_OPTION_UFACTOR, mrtype_et_METIS_RTYPE_FM, mrtype_et_METIS_RTYPE_GREEDY,
    rstatus_et_METIS_ERROR_INPUT, rstatus_et_METIS_ERROR_MEMORY, rstatus_et_METIS_OK,
    METIS_PartGraphKway, METIS_PartGraphRecursive, METIS_SetDefaultOptions, METIS_NOPTIONS,
};
use petgraph::visit::EdgeRef;
use std::ptr::null_mut;
use thiserror::Error;

/// Specifies the used algorithm.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum PartitioningMethod {
    /// Multilevel k-way partitioning
    /// `METIS_PartGraphKway`
    #[default]
    MultilevelKWay,
    /// Multilevel recursive bisection
    /// `METIS_PartGraphRecursive`
    MultilevelRecursiveBisection,
}

/// Specifies the matching scheme to be used during coarsening
/// `METIS_OPTION_CTYPE`
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CoarseningScheme {
    /// Random matching
    /// `METIS_CTYPE_RM`
    RandomMatching,
    /// Sorted heavy-edge matching
    /// `METIS_CTYPE_SHEM`
    SortedHeavyEdgeMatching,
}

/// Specifies the algorithm used during initial partitioning
/// `METIS_OPTION_IPTYPE`
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InitialPartitioningAlgorithm {
    /// Grows a bisection using a greedy strategy
    /// `METIS_IPTYPE_GROW`
    GreedyGrow,
    /// Computes a bisection at random followed by a refinement
    /// `METIS_IPTYPE_RANDOM`
    RandomRefined,
}

/// Specifies the algorithm used for refinement
/// `METIS_OPTION_RTYPE`
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RefinementAlgorithm {
    /// FM-based cut refinement
    /// `METIS_RTYPE_FM`
    Fm,
    /// Greedy-based cut and volume refinement
    /// `METIS_RTYPE_GREEDY`
    Greedy,
}

/// `METIS_OPTION_OBJTYPE`
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ObjectiveType {
    /// Edge-cut minimization
    /// `METIS_OBJTYPE_CUT`
    EdgeCut,
    /// Total communication volume minimization.
    /// `METIS_OBJTYPE_VOL`
    Volume,
}

impl CoarseningScheme {
    fn option(self) -> idx_t {
        (match self {
            CoarseningScheme::RandomMatching => mctype_et_METIS_CTYPE_RM,
            CoarseningScheme::SortedHeavyEdgeMatching => mctype_et_METIS_CTYPE_SHEM,
        }) as idx_t
    }
}

impl InitialPartitioningAlgorithm {
    fn option(self) -> idx_t {
        (match self {
            InitialPartitioningAlgorithm::GreedyGrow => miptype_et_METIS_IPTYPE_GROW,
            InitialPartitioningAlgorithm::RandomRefined => miptype_et_METIS_IPTYPE_RANDOM,
        }) as idx_t
    }
}

impl RefinementAlgorithm {
    fn option(self) -> idx_t {
        (match self {
            RefinementAlgorithm::Fm => mrtype_et_METIS_RTYPE_FM,
            RefinementAlgorithm::Greedy => mrtype_et_METIS_RTYPE_GREEDY,
        }) as idx_t
    }
}

impl ObjectiveType {
    fn option(self) -> idx_t {
        (match self {
            ObjectiveType::EdgeCut => mobjtype_et_METIS_OBJTYPE_CUT,
            ObjectiveType::Volume => mobjtype_et_METIS_OBJTYPE_VOL,
        }) as idx_t
    }
}

/// Configuration for METIS graph partitioning.
/// Used to select an algorithm and configure METIS options.
/// [`None`] values correspond to the default METIS option.
#[derive(Clone, Debug, Default)]
pub struct PartitioningConfig {
    /// Specifies the used algorithm.
    pub method: PartitioningMethod,
    /// `METIS_OPTION_CTYPE`
    pub coarsening: Option<CoarseningScheme>,
    /// `METIS_OPTION_IPTYPE`
    pub initial_partitioning: Option<InitialPartitioningAlgorithm>,
    /// `METIS_OPTION_RTYPE`
    pub refinement: Option<RefinementAlgorithm>,
    /// Only used by k-way partitioning.
    /// `METIS_OPTION_OBJTYPE`
    pub objective_type: Option<ObjectiveType>,
    /// Specifies the number of different partitionings that it will compute.
    /// The final partitioning is the one that achieves the best edgecut or communication volume.
    /// `METIS_OPTION_NCUTS`
    pub partitioning_attempts: Option<i32>,
    /// Specifies the number of iterations for the refinement algorithms at each stage of the uncoarsening process.
    /// `METIS_OPTION_NITER`
    pub refinement_iterations: Option<i32>,
    /// `METIS_OPTION_SEED`
    pub rng_seed: Option<i32>,
    /// Specifies that the partitioning routines should try to minimize the maximum degree of the subdomain graph.
    /// `METIS_OPTION_MINCONN`
    pub minimize_subgraph_degree: Option<bool>,
    /// `METIS_OPTION_NO2HOP`
    pub two_hop_matching: Option<bool>,
    /// Specifies that the partitioning routines should try to produce partitions that are contiguous.
    /// Ignored by METIS if the input graph is not connected.
    /// `METIS_OPTION_CONTIG`
    pub force_contiguous_partitions: Option<bool>,
    /// Specifies the maximum allowed load imbalance among the partitions, in thousandths.
    /// `METIS_OPTION_UFACTOR`
    pub u_factor: Option<i32>,
}

impl PartitioningConfig {
    fn apply(&self, options: &mut [idx_t]) {
        assert_eq!(options.len(), METIS_NOPTIONS as usize);

        if let Some(x) = self.coarsening {
            options[moptions_et_METIS_OPTION_CTYPE as usize] = x.option();
        }
        if let Some(x) = self.initial_partitioning {
            options[moptions_et_METIS_OPTION_IPTYPE as usize] = x.option();
        }
        if let Some(x) = self.refinement {
            options[moptions_et_METIS_OPTION_RTYPE as usize] = x.option();
        }
        if let Some(x) = self.partitioning_attempts {
            options[moptions_et_METIS_OPTION_NCUTS as usize] = x as _;
        }
        if let Some(x) = self.refinement_iterations {
            options[moptions_et_METIS_OPTION_NITER as usize] = x as _;
        }
        if let Some(x) = self.rng_seed {
            options[moptions_et_METIS_OPTION_SEED as usize] = x as _;
        }
        if let Some(x) = self.u_factor {
            options[moptions_et_METIS_OPTION_UFACTOR as usize] = x as _;
        }
        if let Some(x) = self.two_hop_matching {
            options[moptions_et_METIS_OPTION_NO2HOP as usize] = 1 - idx_t::from(x);
        }

        // Recursive bisection rejects the k-way only options
        if self.method == PartitioningMethod::MultilevelKWay {
            if let Some(x) = self.objective_type {
                options[moptions_et_METIS_OPTION_OBJTYPE as usize] = x.option();
            }
            if let Some(x) = self.minimize_subgraph_degree {
                options[moptions_et_METIS_OPTION_MINCONN as usize] = idx_t::from(x);
            }
            if let Some(x) = self.force_contiguous_partitions {
                options[moptions_et_METIS_OPTION_CONTIG as usize] = idx_t::from(x);
            }
        }
    }

    pub fn partition_from_edge_weighted_graph<V>(
        &self,
        partitions: u32,
        graph: &petgraph::graph::UnGraph<V, idx_t>,
    ) -> Result<Vec<u32>, PartitioningError> {
        let mut adjacency = Vec::with_capacity(2 * graph.edge_count());
        let mut adjacency_weight = Vec::with_capacity(2 * graph.edge_count());
        let mut adjacency_idx = Vec::with_capacity(graph.node_count() + 1);

        for v in graph.node_indices() {
            adjacency_idx.push(adjacency.len() as idx_t);

            for e in graph.edges(v) {
                let other = if v == e.target() {
                    e.source()
                } else {
                    e.target()
                };

                adjacency.push(other.index() as idx_t);
                adjacency_weight.push(*e.weight());
            }
        }
        adjacency_idx.push(adjacency.len() as idx_t);

        let graph = CsrGraph::from_raw(adjacency_idx, adjacency, adjacency_weight)?;

        self.partition_csr(partitions, &graph)
    }

    /// Split the nodes of `graph` into `partitions` parts, minimising the weight of cut edges.
    /// Returns the part id of every node, each in `0..partitions`.
    ///
    /// A graph with no edges is split into contiguous runs of nodes, as METIS has nothing to work with.
    pub fn partition_csr(
        &self,
        partitions: u32,
        graph: &CsrGraph,
    ) -> Result<Vec<u32>, PartitioningError> {
        let nodes = graph.node_count();

        if partitions == 0 {
            return Err(PartitioningError::Input);
        }
        if partitions == 1 || nodes == 0 {
            return Ok(vec![0; nodes]);
        }
        if graph.edge_count() == 0 {
            let run = nodes.div_ceil(partitions as usize);
            return Ok((0..nodes).map(|i| (i / run) as u32).collect());
        }

        let part = self.partition_from_adj(
            partitions,
            nodes,
            graph.adjacency().to_vec(),
            graph.adjacency_idx().to_vec(),
            graph.adjacency_weight().to_vec(),
        )?;

        if let Some(&p) = part.iter().find(|&&p| p >= partitions) {
            log::error!("METIS returned part {p} of {partitions}");
            return Err(PartitioningError::Other);
        }

        Ok(part)
    }

    fn partition_from_adj(
        &self,
        partitions: u32,
        nodes: usize,
        mut adjacency: Vec<idx_t>,
        mut adjacency_idx: Vec<idx_t>,
        mut adjacency_weight: Vec<idx_t>,
    ) -> Result<Vec<u32>, PartitioningError> {
        let mut n = nodes as idx_t;
        let mut part = vec![0 as idx_t; nodes];
        let mut edge_cut = 0 as idx_t;
        let mut nparts = partitions as idx_t;
        let mut num_constraints = 1 as idx_t;

        let mut options = [0 as idx_t; METIS_NOPTIONS as usize];
        unsafe {
            METIS_SetDefaultOptions(options.as_mut_ptr());
        }
        self.apply(&mut options);

        let partition_fn = match self.method {
            PartitioningMethod::MultilevelKWay => METIS_PartGraphKway,
            PartitioningMethod::MultilevelRecursiveBisection => METIS_PartGraphRecursive,
        };

        // SAFETY: every buffer outlives the call, and the CSR layout was validated when the graph was built.
        let status = unsafe {
            partition_fn(
                &mut n,
                &mut num_constraints,
                adjacency_idx.as_mut_ptr(),
                adjacency.as_mut_ptr(),
                null_mut(),
                null_mut(),
                adjacency_weight.as_mut_ptr(),
                &mut nparts,
                null_mut(),
                null_mut(),
                options.as_mut_ptr(),
                &mut edge_cut,
                part.as_mut_ptr(),
            )
        };

        match status {
            s if s == rstatus_et_METIS_OK as i32 => {
                log::trace!("Partitioned {nodes} nodes into {partitions} parts, cut {edge_cut}");
                Ok(part.into_iter().map(|p| p as u32).collect())
            }
            s if s == rstatus_et_METIS_ERROR_INPUT as i32 => Err(PartitioningError::Input),
            s if s == rstatus_et_METIS_ERROR_MEMORY as i32 => Err(PartitioningError::Memory),
            _ => Err(PartitioningError::Other),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PartitioningError {
    #[error("Number weights did not correspond to edge count")]
    WeightsMismatch,
    #[error("Malformed adjacency structure: {0}")]
    InvalidGraph(String),
    #[error("Erroneous inputs and/or options")]
    Input,
    #[error("Insufficient memory")]
    Memory,
    #[error("Other error")]
    Other,
}
