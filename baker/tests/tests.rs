use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use baker::{
    bake, bake_with,
    lod::{
        cluster_partition::GraphPartitioner,
        level_builder::{LevelBuilder, StopReason},
        LodLevel,
    },
    meshlets::{
        MeshSimplifier, MeshletBuildResult, MeshletDesc, MeshletError, MeshletGenerator,
        MeshletParams, Simplified, SimplifyMode,
    },
    BakeConfig, BakeError, BakeInput, BakeOutput, Escalation,
};
use common::{Asset, BoundingSphere, MeshVert, MeshletCollection, TriMesh};
use glam::Vec3;
use metis::{CsrGraph, PartitioningError};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Splits the index buffer into runs of a fixed number of triangles, in order.
#[derive(Clone, Copy)]
struct ChunkGenerator<'a> {
    verts: &'a [MeshVert],
    tris_per_meshlet: usize,
}

impl MeshletGenerator for ChunkGenerator<'_> {
    fn generate(&self, indices: &[u32]) -> Result<MeshletBuildResult, MeshletError> {
        let mut result = MeshletBuildResult::default();

        for chunk in indices.chunks(self.tris_per_meshlet * 3) {
            let vertex_offset = result.vertices.len() as u32;
            let triangle_offset = result.triangles.len() as u32;
            let mut local: Vec<u32> = Vec::new();

            for &i in chunk {
                let l = match local.iter().position(|&v| v == i) {
                    Some(l) => l,
                    None => {
                        local.push(i);
                        local.len() - 1
                    }
                };
                result.triangles.push(l as u8);
            }

            let (min, max) = local.iter().fold(
                (Vec3::INFINITY, Vec3::NEG_INFINITY),
                |(min, max), &v| {
                    let p = self.verts[v as usize].position();
                    (min.min(p), max.max(p))
                },
            );

            result.meshlets.push(MeshletDesc {
                vertex_offset,
                vertex_count: local.len() as u32,
                triangle_offset,
                triangle_count: (chunk.len() / 3) as u32,
                bounds: BoundingSphere::from_aabb(min, max),
                cone: Default::default(),
            });
            result.vertices.extend(local);
        }

        Ok(result)
    }
}

#[derive(Clone, Copy)]
enum Keep {
    Half,
    All,
}

/// Keeps the first half of the triangles, or all of them, depending on the mode.
struct Decimate<'a> {
    generator: ChunkGenerator<'a>,
    normal: Keep,
    sloppy: Keep,
    error: f32,
    calls: Mutex<Vec<SimplifyMode>>,
}

impl<'a> Decimate<'a> {
    fn new(generator: ChunkGenerator<'a>, normal: Keep, sloppy: Keep) -> Self {
        Self {
            generator,
            normal,
            sloppy,
            error: 0.01,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn modes(&self) -> Vec<SimplifyMode> {
        self.calls.lock().unwrap().clone()
    }
}

impl MeshSimplifier for Decimate<'_> {
    fn simplify(
        &self,
        indices: &[u32],
        _target_error: f32,
        mode: SimplifyMode,
    ) -> Result<Simplified, MeshletError> {
        self.calls.lock().unwrap().push(mode);

        let keep = match mode {
            SimplifyMode::Normal => self.normal,
            SimplifyMode::Sloppy => self.sloppy,
        };
        let tris = indices.len() / 3;
        let kept = match keep {
            Keep::Half => (tris / 2).max(1),
            Keep::All => tris,
        };

        Ok(Simplified {
            meshlets: self.generator.generate(&indices[..kept * 3])?,
            error: self.error,
        })
    }
}

/// Balanced runs of consecutive nodes.
#[derive(Default)]
struct Contiguous {
    calls: AtomicUsize,
}

impl GraphPartitioner for Contiguous {
    fn partition(&self, graph: &CsrGraph, parts: u32) -> Result<Vec<u32>, PartitioningError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let n = graph.node_count();
        Ok((0..n).map(|i| (i * parts as usize / n) as u32).collect())
    }
}

struct Failing;

impl GraphPartitioner for Failing {
    fn partition(&self, _: &CsrGraph, _: u32) -> Result<Vec<u32>, PartitioningError> {
        Err(PartitioningError::Other)
    }
}

struct BrokenSimplifier;

impl MeshSimplifier for BrokenSimplifier {
    fn simplify(&self, _: &[u32], _: f32, _: SimplifyMode) -> Result<Simplified, MeshletError> {
        Err(MeshletError::Other("broken".to_owned()))
    }
}

struct AllInOne;

impl GraphPartitioner for AllInOne {
    fn partition(&self, graph: &CsrGraph, _: u32) -> Result<Vec<u32>, PartitioningError> {
        Ok(vec![0; graph.node_count()])
    }
}

fn mesh_data(mesh: &TriMesh) -> (Vec<MeshVert>, Vec<u32>) {
    (mesh.to_mesh_verts(), mesh.indices.to_vec())
}

fn input<'a>(verts: &'a [MeshVert], indices: &'a [u32]) -> BakeInput<'a> {
    BakeInput {
        name: "test".to_owned(),
        verts,
        indices,
    }
}

fn validating() -> BakeConfig {
    BakeConfig {
        validate: true,
        ..Default::default()
    }
}

/// Check the flattened DAG: root marking, monotonic errors, bounds containment and level order.
fn assert_sound(output: &BakeOutput) {
    assert_eq!(output.issues, vec![], "validation issues");

    let c = &output.collection;
    assert_eq!(c.level_node_counts.len(), c.level_count as usize);
    assert_eq!(
        c.level_node_counts.iter().sum::<u32>() as usize,
        c.nodes.len()
    );
    assert_eq!(
        *c.level_node_counts.last().unwrap(),
        c.leaf_meshlet_count,
        "leaf level must survive"
    );

    for level in 0..c.level_count as usize {
        for node in c.level_nodes(level) {
            assert_eq!(node.level as usize, level);

            if level == 0 {
                assert!(node.is_root());
                assert_eq!(node.parent_error, -1.0);
                continue;
            }

            assert!(node.error < node.parent_error);
            let tolerance = 1e-5 * node.parent_bounds.radius().max(1.0);
            assert!(node.parent_bounds.contains_sphere(&node.bounds, tolerance));
        }

        if level + 1 < c.level_count as usize {
            assert!(c.level_triangle_count(level) <= c.level_triangle_count(level + 1));
        }
    }

    for node in c.level_nodes(c.level_count as usize - 1) {
        assert_eq!(node.error, 0.0);
    }
}

#[test]
fn test_single_meshlet_is_root() {
    let (verts, indices) = mesh_data(&TriMesh::grid(1, 1));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);

    let output = bake_with(
        input(&verts, &indices),
        &validating(),
        &generator,
        &simplifier,
        &Failing,
    )
    .unwrap();

    let c = &output.collection;
    assert_eq!(c.level_count, 1);
    assert_eq!(c.nodes.len(), 1);
    assert_eq!(c.nodes[0].error, 0.0);
    assert_eq!(c.nodes[0].parent_error, -1.0);
    assert!(simplifier.modes().is_empty());
    assert_sound(&output);
}

#[test]
fn test_small_level_is_one_group() {
    let (verts, indices) = mesh_data(&TriMesh::triangle_soup(3, 1));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 1,
    };
    let mut simplifier = Decimate::new(generator, Keep::Half, Keep::Half);
    simplifier.error = 0.0;

    // Three nodes fit one group of four, so the partitioner is never asked
    let output = bake_with(
        input(&verts, &indices),
        &validating(),
        &generator,
        &simplifier,
        &Failing,
    )
    .unwrap();

    let c = &output.collection;
    assert_eq!(c.level_node_counts, vec![1, 3]);

    let root = &c.level_nodes(0)[0];
    assert_eq!(root.error, 1e-4);
    for leaf in c.level_nodes(1) {
        assert_eq!(leaf.parent_error, root.error);
        assert_eq!(leaf.parent_bounds, root.bounds);
    }
    assert_sound(&output);
}

#[test]
fn test_chain_reaches_single_node() {
    let (verts, indices) = mesh_data(&TriMesh::grid(8, 8));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);
    let partitioner = Contiguous::default();

    let output = bake_with(
        input(&verts, &indices),
        &validating(),
        &generator,
        &simplifier,
        &partitioner,
    )
    .unwrap();

    let c = &output.collection;
    assert!(c.level_count > 3);
    assert_eq!(c.level_node_counts[0], 1);
    assert_eq!(c.leaf_meshlet_count, 32);
    assert_eq!(c.level_triangle_count(c.level_count as usize - 1), 128);
    assert!(output.warnings.is_empty());
    assert!(simplifier.modes().iter().all(|&m| m == SimplifyMode::Normal));
    assert_sound(&output);

    // Errors strictly grow toward the root
    for level in 1..c.level_count as usize {
        let coarse = c.level_nodes(level - 1).iter().map(|n| n.error).fold(0.0, f32::max);
        let fine = c.level_nodes(level).iter().map(|n| n.error).fold(0.0, f32::max);
        assert!(coarse > fine);
    }
}

#[test]
fn test_no_reduction_stops_after_sloppy_retry() {
    let (verts, indices) = mesh_data(&TriMesh::grid(8, 8));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };
    let simplifier = Decimate::new(generator, Keep::All, Keep::All);
    let partitioner = Contiguous::default();

    let output = bake_with(
        input(&verts, &indices),
        &validating(),
        &generator,
        &simplifier,
        &partitioner,
    )
    .unwrap();

    let c = &output.collection;
    assert_eq!(c.level_count, 1);
    assert!(c.nodes.iter().all(|n| n.is_root() && n.error == 0.0));
    assert_sound(&output);

    // The retry reuses the grouping
    assert_eq!(partitioner.calls.load(Ordering::Relaxed), 1);
    let modes = simplifier.modes();
    let groups = modes.len() / 2;
    assert!(modes[..groups].iter().all(|&m| m == SimplifyMode::Normal));
    assert!(modes[groups..].iter().all(|&m| m == SimplifyMode::Sloppy));
}

fn leaf_level(generator: &ChunkGenerator, indices: &[u32]) -> LodLevel {
    LodLevel::leaf(generator.generate(indices).unwrap())
}

#[test]
fn test_max_steps_counts_retries() {
    let (verts, indices) = mesh_data(&TriMesh::grid(8, 8));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };

    for (escalation, expected_levels) in [(Escalation::PerLevel, 3), (Escalation::Sticky, 4)] {
        let config = BakeConfig {
            max_steps: 4,
            escalation,
            ..Default::default()
        };
        let simplifier = Decimate::new(generator, Keep::All, Keep::Half);
        let partitioner = Contiguous::default();

        let mut levels = vec![leaf_level(&generator, &indices)];
        let stop = LevelBuilder::new(&config, &simplifier, &partitioner)
            .build_chain(&mut levels)
            .unwrap();

        assert_eq!(stop, StopReason::MaxSteps);
        assert_eq!(levels.len(), expected_levels, "{escalation:?}");

        let modes = simplifier.modes();
        let first_sloppy = modes
            .iter()
            .position(|&m| m == SimplifyMode::Sloppy)
            .unwrap();
        let normal_after_sloppy = modes[first_sloppy..].contains(&SimplifyMode::Normal);

        match escalation {
            Escalation::PerLevel => {
                assert!(normal_after_sloppy);
                assert_eq!(partitioner.calls.load(Ordering::Relaxed), 2);
            }
            Escalation::Sticky => assert!(!normal_after_sloppy),
        }
    }
}

/// One triangle repeated, so every node shares all of its edges with every other node.
fn stacked_triangle(count: usize) -> (Vec<MeshVert>, Vec<u32>) {
    let (verts, _) = mesh_data(&TriMesh::grid(1, 1));
    let indices = [0, 2, 1].repeat(count);
    (verts, indices)
}

#[test]
fn test_fully_connected_level_terminates() {
    let (verts, indices) = stacked_triangle(16);
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 1,
    };
    let config = BakeConfig {
        max_steps: 8,
        ..Default::default()
    };

    // Halving reaches a single node: 16 nodes, 6 groups, 2 groups, then one trivial group
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);
    let partitioner = Contiguous::default();
    let mut levels = vec![leaf_level(&generator, &indices)];
    let stop = LevelBuilder::new(&config, &simplifier, &partitioner)
        .build_chain(&mut levels)
        .unwrap();

    assert_eq!(stop, StopReason::SingleNode);
    assert!(levels.len() <= config.max_steps + 1);
    let counts: Vec<usize> = levels.iter().map(LodLevel::node_count).collect();
    assert_eq!(counts, vec![16, 6, 2, 1]);
    assert_eq!(partitioner.calls.load(Ordering::Relaxed), 2);

    // Nothing ever reduces: one normal pass, one sloppy retry, then stop
    let simplifier = Decimate::new(generator, Keep::All, Keep::All);
    let partitioner = Contiguous::default();
    let mut levels = vec![leaf_level(&generator, &indices)];
    let stop = LevelBuilder::new(&config, &simplifier, &partitioner)
        .build_chain(&mut levels)
        .unwrap();

    assert_eq!(stop, StopReason::InsufficientReduction);
    assert_eq!(levels.len(), 1);
    assert_eq!(partitioner.calls.load(Ordering::Relaxed), 1);
    // The partitioned grouping is kept on the level that failed to reduce
    assert_eq!(levels[0].groups().len(), 6);
    assert_eq!(levels[0].groups()[0], vec![0, 1, 2]);

    // Halving with a tight step budget stops on the budget
    let config = BakeConfig {
        max_steps: 2,
        ..Default::default()
    };
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);
    let mut levels = vec![leaf_level(&generator, &indices)];
    let stop = LevelBuilder::new(&config, &simplifier, &Contiguous::default())
        .build_chain(&mut levels)
        .unwrap();

    assert_eq!(stop, StopReason::MaxSteps);
    assert_eq!(levels.len(), 3);
}

#[test]
fn test_zero_steps_keeps_leaves() {
    let (verts, indices) = mesh_data(&TriMesh::grid(4, 4));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);
    let config = BakeConfig {
        max_steps: 0,
        ..validating()
    };

    let output = bake_with(
        input(&verts, &indices),
        &config,
        &generator,
        &simplifier,
        &Contiguous::default(),
    )
    .unwrap();

    assert_eq!(output.collection.level_count, 1);
    assert_eq!(output.collection.level_node_counts, vec![8]);
    assert_sound(&output);
}

#[test]
fn test_level_cap_keeps_finest() {
    let (verts, indices) = mesh_data(&TriMesh::grid(8, 8));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);
    let config = BakeConfig {
        max_level_count: 2,
        ..validating()
    };

    let output = bake_with(
        input(&verts, &indices),
        &config,
        &generator,
        &simplifier,
        &Contiguous::default(),
    )
    .unwrap();

    let c = &output.collection;
    assert_eq!(c.level_count, 2);
    assert_eq!(c.level_node_counts[1], 32);
    assert!(c.level_node_counts[0] > 1);
    assert!(c.level_nodes(0).iter().all(|n| n.is_root() && n.error > 0.0));
    assert_sound(&output);
}

#[test]
fn test_group_overflow_is_fatal() {
    let (verts, indices) = mesh_data(&TriMesh::grid(4, 4));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);

    let err = bake_with(
        input(&verts, &indices),
        &BakeConfig::default(),
        &generator,
        &simplifier,
        &AllInOne,
    )
    .err()
    .unwrap();

    assert!(matches!(
        err,
        BakeError::GroupOverflow {
            level: 0,
            partition: 0,
            node: 4,
            capacity: 4
        }
    ));
}

#[test]
fn test_partitioner_failure_is_fatal() {
    let (verts, indices) = mesh_data(&TriMesh::grid(4, 4));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);

    let err = bake_with(
        input(&verts, &indices),
        &BakeConfig::default(),
        &generator,
        &simplifier,
        &Failing,
    )
    .err()
    .unwrap();

    assert!(matches!(
        err,
        BakeError::Partitioning {
            level: 0,
            source: PartitioningError::Other
        }
    ));
}

#[test]
fn test_errors_name_the_source_level() {
    let (verts, indices) = mesh_data(&TriMesh::grid(8, 8));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };

    let err = bake_with(
        input(&verts, &indices),
        &BakeConfig::default(),
        &generator,
        &BrokenSimplifier,
        &Contiguous::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, BakeError::Meshlets { level: 0, .. }));

    // Partitioning and simplification of the same level report the same index
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);
    let mut levels = vec![leaf_level(&generator, &indices)];
    let config = BakeConfig {
        max_steps: 1,
        ..Default::default()
    };
    LevelBuilder::new(&config, &simplifier, &Contiguous::default())
        .build_chain(&mut levels)
        .unwrap();

    let err = LevelBuilder::new(&BakeConfig::default(), &BrokenSimplifier, &Contiguous::default())
        .build_chain(&mut levels)
        .err()
        .unwrap();
    assert!(matches!(err, BakeError::Meshlets { level: 1, .. }));

    let err = LevelBuilder::new(&BakeConfig::default(), &simplifier, &Failing)
        .build_chain(&mut levels)
        .err()
        .unwrap();
    assert!(matches!(err, BakeError::Partitioning { level: 1, .. }));
}

#[test]
fn test_negative_error_is_fatal() {
    let (verts, indices) = mesh_data(&TriMesh::grid(4, 4));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };
    let mut simplifier = Decimate::new(generator, Keep::Half, Keep::Half);
    simplifier.error = -0.5;

    let err = bake_with(
        input(&verts, &indices),
        &BakeConfig::default(),
        &generator,
        &simplifier,
        &Contiguous::default(),
    )
    .err()
    .unwrap();

    assert!(matches!(
        err,
        BakeError::NegativeSimplificationError { level: 0, .. }
    ));
}

#[test]
fn test_empty_and_invalid_input() {
    let (verts, _) = mesh_data(&TriMesh::grid(1, 1));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);

    let fail = |indices: &[u32], config: &BakeConfig| {
        bake_with(
            input(&verts, indices),
            config,
            &generator,
            &simplifier,
            &Failing,
        )
        .err()
        .unwrap()
    };

    assert!(matches!(
        fail(&[], &BakeConfig::default()),
        BakeError::EmptyMesh
    ));
    assert!(matches!(
        fail(&[0, 1, 7], &BakeConfig::default()),
        BakeError::Meshlets {
            level: 0,
            source: MeshletError::IndexOutOfRange { index: 7, .. }
        }
    ));
    assert!(matches!(
        fail(
            &[0, 1, 2],
            &BakeConfig {
                meshlets_per_group: 1,
                ..Default::default()
            }
        ),
        BakeError::InvalidConfig(_)
    ));
}

#[test]
fn test_node_limit_warns() {
    let (verts, indices) = mesh_data(&TriMesh::grid(4, 4));
    let generator = ChunkGenerator {
        verts: &verts,
        tris_per_meshlet: 4,
    };
    let simplifier = Decimate::new(generator, Keep::Half, Keep::Half);
    let config = BakeConfig {
        max_lod_nodes: 4,
        ..Default::default()
    };

    let output = bake_with(
        input(&verts, &indices),
        &config,
        &generator,
        &simplifier,
        &Contiguous::default(),
    )
    .unwrap();

    assert_eq!(output.warnings.len(), 2);
}

fn meshopt_config() -> BakeConfig {
    BakeConfig {
        target_error_sloppy: 0.1,
        meshlet: MeshletParams {
            max_vertices: 64,
            max_triangles: 32,
            ..Default::default()
        },
        ..validating()
    }
}

#[test]
fn test_grid_bake() {
    let mesh = TriMesh::grid(10, 10);
    let config = BakeConfig {
        max_level_count: 3,
        ..meshopt_config()
    };

    let output = bake(&mesh, "grid".to_owned(), &config).unwrap();
    assert_sound(&output);

    let c = &output.collection;
    assert_eq!(c.level_count, 3);
    assert_eq!(c.level_triangle_count(2), 200);
    assert!(c.level_triangle_count(0) < c.level_triangle_count(1));
    assert_eq!(c.aabb(), mesh.aabb());

    // A single root node encloses the whole mesh
    let (min, max) = c.aabb();
    let corners: Vec<Vec3> = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        })
        .collect();
    assert!(c.level_nodes(0).iter().any(|n| corners
        .iter()
        .all(|&corner| n.bounds.contains_point(corner, 1e-3))));
}

#[test]
fn test_sphere_bake() {
    let mesh = TriMesh::uv_sphere(16, 24);

    let output = bake(&mesh, "sphere".to_owned(), &meshopt_config()).unwrap();
    assert_sound(&output);

    let c = &output.collection;
    assert!(c.level_count >= 2);
    assert!(c.triangle_count() > mesh.triangle_count());
    assert_eq!(
        c.level_triangle_count(c.level_count as usize - 1),
        mesh.triangle_count()
    );
}

#[test]
fn test_triangle_soup_bake() {
    let mesh = TriMesh::triangle_soup(300, 42);
    let config = BakeConfig {
        optimize_vertex_cache: true,
        ..meshopt_config()
    };

    let output = bake(&mesh, "soup".to_owned(), &config).unwrap();
    assert_sound(&output);
    assert_eq!(
        output
            .collection
            .level_triangle_count(output.collection.level_count as usize - 1),
        300
    );
}

#[test]
fn test_random_terrain_bake() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut mesh = TriMesh::grid(16, 16);
    for v in mesh.verts.iter_mut() {
        v.y = rng.gen_range(-0.2..0.2);
    }
    mesh.compute_normals();

    let output = bake(&mesh, "terrain".to_owned(), &meshopt_config()).unwrap();
    assert_sound(&output);

    let c = &output.collection;
    assert!(c.level_count >= 2);
    assert!(c.level_nodes(0).iter().all(|n| n.error > 0.0));
}

#[test]
fn test_baked_asset_round_trip() {
    let mesh = TriMesh::uv_sphere(8, 12);

    let output = bake(&mesh, "sphere".to_owned(), &meshopt_config()).unwrap();
    let bytes = output.collection.to_bytes().unwrap();

    assert_eq!(
        MeshletCollection::from_bytes(&bytes).unwrap(),
        output.collection
    );
}
