pub mod asset;
mod bounding_sphere;
mod cone;
mod mesh_vert;
mod meshlet;
mod meshlet_collection;
mod tri_mesh;
mod vec3;

pub use asset::{Asset, AssetError};
pub use bounding_sphere::BoundingSphere;
pub use cone::NormalCone;
pub use mesh_vert::MeshVert;
pub use meshlet::Meshlet;
pub use meshlet_collection::{MeshLodNode, MeshletCollection, ROOT_PARENT_ERROR};
pub use tri_mesh::{TriMesh, TriMeshError};
