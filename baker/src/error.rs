use metis::PartitioningError;
use thiserror::Error;

use crate::meshlets::MeshletError;

/// Fatal bake failures. Level indices count from the leaf level, in build order, and name the
/// level whose nodes were being clustered, grouped or simplified.
#[derive(Debug, Error)]
pub enum BakeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Mesh has no triangles")]
    EmptyMesh,
    #[error("Meshlet generation failed on level {level}: {source}")]
    Meshlets { level: usize, source: MeshletError },
    #[error("Partitioning level {level} failed: {source}")]
    Partitioning {
        level: usize,
        source: PartitioningError,
    },
    #[error("Level {level} node {node} assigned partition {partition}, expected less than {partition_count}")]
    PartitionOutOfRange {
        level: usize,
        node: usize,
        partition: u32,
        partition_count: u32,
    },
    #[error("Level {level} partition {partition} is full ({capacity} nodes), no slot for node {node}")]
    GroupOverflow {
        level: usize,
        partition: u32,
        node: usize,
        capacity: usize,
    },
    #[error("Level {level} group {group} reported negative simplification error {error}")]
    NegativeSimplificationError { level: usize, group: usize, error: f32 },
    #[error("Level {level} group {group} error {node_error} does not exceed source error {source_error}")]
    NonIncreasingError {
        level: usize,
        group: usize,
        source_error: f32,
        node_error: f32,
    },
    #[error("Level {level} node {node} error {error} exceeds parent error {parent_error}")]
    NonMonotonicError {
        level: usize,
        node: usize,
        error: f32,
        parent_error: f32,
    },
}

/// Limit overruns the caller may choose to reject.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BakeWarning {
    #[error("Mesh LOD node count exceeds the limit: {count}/{limit}")]
    NodeLimitExceeded { count: usize, limit: usize },
    #[error("Meshlet count exceeds the limit: {count}/{limit}")]
    MeshletLimitExceeded { count: usize, limit: usize },
}
