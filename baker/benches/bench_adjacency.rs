use baker::{
    lod::edge_adjacency::AdjacencyGraph,
    meshlets::{MeshletGenerator, MeshletParams, MeshoptMeshletGenerator},
};
use common::TriMesh;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sphere_meshlets() -> Vec<Vec<u32>> {
    let mesh = TriMesh::uv_sphere(64, 96);
    let verts = mesh.to_mesh_verts();
    let params = MeshletParams {
        max_vertices: 64,
        max_triangles: 64,
        ..Default::default()
    };

    let build = MeshoptMeshletGenerator::new(&verts, params)
        .generate(&mesh.indices)
        .unwrap();

    (0..build.len()).map(|i| build.meshlet_indices(i)).collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let meshlets = sphere_meshlets();

    c.bench_function(&format!("adjacency {} meshlets", meshlets.len()), |b| {
        b.iter(|| AdjacencyGraph::from_node_indices(black_box(&meshlets)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
