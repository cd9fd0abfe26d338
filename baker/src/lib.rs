pub mod config;
mod error;
pub mod lod;
pub mod meshlets;

use common::{MeshVert, MeshletCollection, TriMesh};
use glam::Vec3;

pub use config::{BakeConfig, Escalation};
pub use error::{BakeError, BakeWarning};
use lod::{
    cluster_partition::GraphPartitioner,
    flatten::{flatten, FlattenSource},
    level_builder::LevelBuilder,
    validate::{validate_levels, ValidationIssue},
    LodLevel,
};
use meshlets::{
    check_indices, MeshSimplifier, MeshletGenerator, MeshoptMeshletGenerator, MeshoptSimplifier,
};

/// Geometry to bake.
pub struct BakeInput<'a> {
    pub name: String,
    pub verts: &'a [MeshVert],
    pub indices: &'a [u32],
}

pub struct BakeOutput {
    pub collection: MeshletCollection,
    pub warnings: Vec<BakeWarning>,
    /// Empty unless [`BakeConfig::validate`] is set
    pub issues: Vec<ValidationIssue>,
}

/// Partitioning used by [`bake`]. Contiguous parts are not forced,
/// meshlet adjacency is often disconnected.
pub fn default_partitioner() -> metis::PartitioningConfig {
    metis::PartitioningConfig {
        method: metis::PartitioningMethod::MultilevelKWay,
        ..Default::default()
    }
}

/// Bake `mesh` with meshoptimizer and METIS.
pub fn bake(mesh: &TriMesh, name: String, config: &BakeConfig) -> Result<BakeOutput, BakeError> {
    let verts = mesh.to_mesh_verts();

    let generator = MeshoptMeshletGenerator::new(&verts, config.meshlet);
    let simplifier = MeshoptSimplifier::new(&verts, config.meshlet, config.simplify_target_ratio);

    bake_with(
        BakeInput {
            name,
            verts: &verts,
            indices: &mesh.indices,
        },
        config,
        &generator,
        &simplifier,
        &default_partitioner(),
    )
}

/// Bake with the given collaborators. `generator` and `simplifier` must index into `input.verts`.
pub fn bake_with(
    input: BakeInput,
    config: &BakeConfig,
    generator: &dyn MeshletGenerator,
    simplifier: &dyn MeshSimplifier,
    partitioner: &dyn GraphPartitioner,
) -> Result<BakeOutput, BakeError> {
    config.validate()?;

    if input.indices.is_empty() {
        return Err(BakeError::EmptyMesh);
    }
    check_indices(input.indices, input.verts.len())
        .map_err(|source| BakeError::Meshlets { level: 0, source })?;

    let indices = if config.optimize_vertex_cache {
        meshopt::optimize_vertex_cache(input.indices, input.verts.len())
    } else {
        input.indices.to_vec()
    };

    let leaf = generator
        .generate(&indices)
        .map_err(|source| BakeError::Meshlets { level: 0, source })?;
    if leaf.is_empty() {
        return Err(BakeError::EmptyMesh);
    }

    log::info!(
        "{}: {} triangles in {} leaf meshlets",
        input.name,
        indices.len() / 3,
        leaf.len()
    );

    let leaf = LodLevel::leaf(leaf);
    let leaf_meshlet_count = leaf.node_count();

    let levels = LevelBuilder::new(config, simplifier, partitioner).build(leaf)?;

    let issues = if config.validate {
        validate_levels(&levels, config.meshlets_per_group)
    } else {
        Vec::new()
    };
    for issue in &issues {
        log::error!("{}: {issue}", input.name);
    }

    let collection = flatten(
        &levels,
        FlattenSource {
            name: input.name,
            verts: input.verts,
            aabb: aabb(input.verts, &indices),
            leaf_meshlet_count,
        },
    );

    let warnings = check_limits(&collection, config.max_lod_nodes);
    for warning in &warnings {
        log::error!("{}: {warning}", collection.name);
    }

    Ok(BakeOutput {
        collection,
        warnings,
        issues,
    })
}

fn aabb(verts: &[MeshVert], indices: &[u32]) -> (Vec3, Vec3) {
    indices.iter().fold(
        (Vec3::INFINITY, Vec3::NEG_INFINITY),
        |(min, max), &i| {
            let p = verts[i as usize].position();
            (min.min(p), max.max(p))
        },
    )
}

fn check_limits(collection: &MeshletCollection, limit: usize) -> Vec<BakeWarning> {
    let mut warnings = Vec::new();

    if collection.nodes.len() > limit {
        warnings.push(BakeWarning::NodeLimitExceeded {
            count: collection.nodes.len(),
            limit,
        });
    }
    if collection.meshlets.len() > limit {
        warnings.push(BakeWarning::MeshletLimitExceeded {
            count: collection.meshlets.len(),
            limit,
        });
    }

    warnings
}
