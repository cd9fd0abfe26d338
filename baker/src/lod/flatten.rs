use common::{MeshLodNode, MeshVert, Meshlet, MeshletCollection};

use super::LodLevel;

/// Source data carried through to the flattened asset.
pub struct FlattenSource<'a> {
    pub name: String,
    pub verts: &'a [MeshVert],
    pub aabb: (glam::Vec3, glam::Vec3),
    pub leaf_meshlet_count: usize,
}

/// Copy `levels`, coarsest first, into the flat buffers of a [`MeshletCollection`].
///
/// Nodes are written group by group, each with its own meshlet, vertices and indices appended
/// at the running end of the output buffers.
pub fn flatten(levels: &[LodLevel], source: FlattenSource) -> MeshletCollection {
    let node_count: usize = levels.iter().map(LodLevel::node_count).sum();

    let mut collection = MeshletCollection {
        name: source.name,
        aabb_min: source.aabb.0.into(),
        aabb_max: source.aabb.1.into(),
        level_count: levels.len() as u32,
        leaf_meshlet_count: source.leaf_meshlet_count as u32,
        level_node_counts: Vec::with_capacity(levels.len()),
        nodes: Vec::with_capacity(node_count),
        meshlets: Vec::with_capacity(node_count),
        vertices: Vec::new(),
        indices: Vec::new(),
    };

    for (level_index, level) in levels.iter().enumerate() {
        let level_start = collection.nodes.len();

        for group in level.groups() {
            for &n in group {
                let node = &level.nodes[n];
                let build = &level.builds[node.meshlet.build];
                let desc = &build.meshlets[node.meshlet.meshlet];

                collection.nodes.push(MeshLodNode {
                    bounds: node.bounds,
                    parent_bounds: node.parent_bounds,
                    parent_error: node.parent_error,
                    error: node.error,
                    meshlet_start: collection.meshlets.len() as u32,
                    meshlet_count: 1,
                    level: level_index as u32,
                });

                collection.meshlets.push(Meshlet {
                    vertex_offset: collection.vertices.len() as u32,
                    triangle_offset: collection.indices.len() as u32,
                    vertex_count: desc.vertex_count,
                    triangle_count: desc.triangle_count,
                    bounds: desc.bounds,
                    cone: desc.cone,
                });

                collection.vertices.extend(
                    build
                        .local_vertices(node.meshlet.meshlet)
                        .iter()
                        .map(|&v| source.verts[v as usize]),
                );
                collection
                    .indices
                    .extend_from_slice(build.local_triangles(node.meshlet.meshlet));
            }
        }

        collection
            .level_node_counts
            .push((collection.nodes.len() - level_start) as u32);
    }

    log::debug!(
        "Flattened {} nodes, {} vertices, {} indices",
        collection.nodes.len(),
        collection.vertices.len(),
        collection.indices.len()
    );

    collection
}
