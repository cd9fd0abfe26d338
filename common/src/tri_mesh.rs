use glam::{Vec2, Vec3, Vec4};
use gltf::mesh::util::ReadIndices;
use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;

use crate::MeshVert;

#[derive(Debug, Error)]
pub enum TriMeshError {
    #[error(transparent)]
    Gltf(#[from] gltf::Error),
    #[error("Mesh {0} not found")]
    MissingMesh(usize),
    #[error("Primitive {primitive} not found in mesh {mesh}")]
    MissingPrimitive { mesh: usize, primitive: usize },
    #[error("Primitive has no vertex positions")]
    MissingPositions,
    #[error("Index count {0} is not a multiple of 3")]
    NotTriangles(usize),
    #[error("{attribute} has {count} values for {vertices} vertices")]
    AttributeCount {
        attribute: &'static str,
        count: usize,
        vertices: usize,
    },
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    pub verts: Box<[Vec4]>,
    pub normals: Box<[Vec4]>,
    /// Empty, or one per vertex
    pub tangents: Box<[Vec4]>,
    /// Empty, or one per vertex
    pub uvs: Box<[Vec2]>,
    pub indices: Box<[u32]>,
}

impl TriMesh {
    /// Load primitive `primitive` of mesh `mesh` from a glTF file.
    /// Missing normals are generated from the faces. Missing tangents and uvs are left zero.
    pub fn from_gltf(
        path: impl AsRef<std::path::Path>,
        mesh: usize,
        primitive: usize,
    ) -> Result<Self, TriMeshError> {
        let (doc, buffers, _) = gltf::import(path)?;

        let m = doc.meshes().nth(mesh).ok_or(TriMeshError::MissingMesh(mesh))?;
        let p = m
            .primitives()
            .nth(primitive)
            .ok_or(TriMeshError::MissingPrimitive { mesh, primitive })?;

        let reader = p.reader(|buffer| Some(&buffers[buffer.index()]));
        let verts: Box<[Vec4]> = reader
            .read_positions()
            .ok_or(TriMeshError::MissingPositions)?
            .map(|[x, y, z]| Vec4::new(x, y, z, 1.0))
            .collect();

        let indices: Box<[u32]> = match reader.read_indices() {
            Some(ReadIndices::U8(iter)) => iter.map(|i| i as _).collect(),
            Some(ReadIndices::U16(iter)) => iter.map(|i| i as _).collect(),
            Some(ReadIndices::U32(iter)) => iter.collect(),
            None => (0..verts.len() as u32).collect(),
        };

        let normals = match reader.read_normals() {
            Some(norm_iter) => norm_iter.map(|[x, y, z]| Vec4::new(x, y, z, 0.0)).collect(),
            None => Vec::new().into(),
        };

        let tangents = match reader.read_tangents() {
            Some(iter) => iter.map(Vec4::from).collect(),
            None => Vec::new().into(),
        };

        let uvs = match reader.read_tex_coords(0) {
            Some(iter) => iter.into_f32().map(Vec2::from).collect(),
            None => Vec::new().into(),
        };

        let mut mesh = TriMesh {
            verts,
            normals,
            tangents,
            uvs,
            indices,
        };
        mesh.validate()?;
        if mesh.normals.len() != mesh.verts.len() {
            mesh.compute_normals();
        }
        Ok(mesh)
    }

    pub fn from_positions(positions: Vec<Vec3>, indices: Vec<u32>) -> Result<Self, TriMeshError> {
        let mut mesh = TriMesh {
            verts: positions.into_iter().map(|p| p.extend(1.0)).collect(),
            indices: indices.into(),
            ..Default::default()
        };
        mesh.validate()?;
        mesh.compute_normals();
        Ok(mesh)
    }

    fn validate(&self) -> Result<(), TriMeshError> {
        if self.indices.len() % 3 != 0 {
            return Err(TriMeshError::NotTriangles(self.indices.len()));
        }
        if !self.tangents.is_empty() && self.tangents.len() != self.verts.len() {
            return Err(TriMeshError::AttributeCount {
                attribute: "TANGENT",
                count: self.tangents.len(),
                vertices: self.verts.len(),
            });
        }
        if !self.uvs.is_empty() && self.uvs.len() != self.verts.len() {
            return Err(TriMeshError::AttributeCount {
                attribute: "TEXCOORD_0",
                count: self.uvs.len(),
                vertices: self.verts.len(),
            });
        }
        Ok(())
    }

    /// Area weighted vertex normals.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.verts.len()];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| self.verts[tri[i] as usize].truncate());
            let n = (b - a).cross(c - a);
            for &i in tri {
                normals[i as usize] += n;
            }
        }

        self.normals = normals
            .into_iter()
            .map(|n| n.normalize_or_zero().extend(0.0))
            .collect();
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleave the vertex attributes, zero where an attribute is missing.
    pub fn to_mesh_verts(&self) -> Vec<MeshVert> {
        (0..self.verts.len())
            .map(|i| MeshVert {
                pos: self.verts[i].into(),
                normal: self.normals.get(i).copied().unwrap_or(Vec4::ZERO).into(),
                tangent: self.tangents.get(i).copied().unwrap_or(Vec4::ZERO).into(),
                uv: self
                    .uvs
                    .get(i)
                    .map_or(Vec4::ZERO, |uv| uv.extend(0.0).extend(0.0))
                    .into(),
            })
            .collect()
    }

    /// Bounds of the referenced vertices, or zero for an empty mesh.
    pub fn aabb(&self) -> (Vec3, Vec3) {
        if self.indices.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }

        self.indices.iter().fold(
            (Vec3::INFINITY, Vec3::NEG_INFINITY),
            |(min, max), &i| {
                let v = self.verts[i as usize].truncate();
                (min.min(v), max.max(v))
            },
        )
    }

    /// Flat grid of `nx` by `ny` quads on the XZ plane, two triangles per quad.
    pub fn grid(nx: u32, ny: u32) -> Self {
        let mut positions = Vec::with_capacity(((nx + 1) * (ny + 1)) as usize);
        for y in 0..=ny {
            for x in 0..=nx {
                positions.push(Vec3::new(x as f32, 0.0, y as f32));
            }
        }

        let mut indices = Vec::with_capacity((nx * ny * 6) as usize);
        let row = nx + 1;
        for y in 0..ny {
            for x in 0..nx {
                let i = y * row + x;
                indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
            }
        }

        Self {
            normals: vec![Vec4::Y; positions.len()].into(),
            tangents: vec![Vec4::new(1.0, 0.0, 0.0, 1.0); positions.len()].into(),
            uvs: positions
                .iter()
                .map(|p| Vec2::new(p.x / nx.max(1) as f32, p.z / ny.max(1) as f32))
                .collect(),
            verts: positions.into_iter().map(|p| p.extend(1.0)).collect(),
            indices: indices.into(),
        }
    }

    /// Unit sphere with `rings` latitude bands and `segments` longitude bands.
    pub fn uv_sphere(rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);

        let mut positions = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        for r in 0..=rings {
            let theta = std::f32::consts::PI * r as f32 / rings as f32;
            for s in 0..=segments {
                let phi = std::f32::consts::TAU * s as f32 / segments as f32;
                positions.push(Vec3::new(
                    theta.sin() * phi.cos(),
                    theta.cos(),
                    theta.sin() * phi.sin(),
                ));
            }
        }

        let row = segments + 1;
        let mut indices = Vec::new();
        for r in 0..rings {
            for s in 0..segments {
                let i = r * row + s;
                if r != 0 {
                    indices.extend_from_slice(&[i, i + 1, i + row]);
                }
                if r != rings - 1 {
                    indices.extend_from_slice(&[i + 1, i + row + 1, i + row]);
                }
            }
        }

        Self {
            normals: positions.iter().map(|p| p.extend(0.0)).collect(),
            verts: positions.into_iter().map(|p| p.extend(1.0)).collect(),
            indices: indices.into(),
            ..Default::default()
        }
    }

    /// `count` disconnected triangles with random corners in the unit cube.
    pub fn triangle_soup(count: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let positions = (0..count * 3)
            .map(|_| Vec3::new(rng.gen(), rng.gen(), rng.gen()))
            .collect::<Vec<_>>();

        let mut mesh = Self {
            verts: positions.into_iter().map(|p| p.extend(1.0)).collect(),
            indices: (0..count * 3).collect(),
            ..Default::default()
        };
        mesh.compute_normals();
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid() {
        let g = TriMesh::grid(10, 10);

        assert_eq!(g.verts.len(), 121);
        assert_eq!(g.triangle_count(), 200);
        assert_eq!(g.aabb(), (Vec3::ZERO, Vec3::new(10.0, 0.0, 10.0)));
        assert!(g.indices.iter().all(|&i| (i as usize) < g.verts.len()));
    }

    #[test]
    fn test_grid_winding_faces_up() {
        let g = TriMesh::grid(2, 2);
        let mut computed = g.clone();
        computed.compute_normals();

        for n in computed.normals.iter() {
            assert!(n.truncate().dot(Vec3::Y) > 0.99, "{n:?}");
        }
    }

    #[test]
    fn test_uv_sphere() {
        let s = TriMesh::uv_sphere(8, 12);

        // Pole bands contribute one triangle per segment, others two
        assert_eq!(s.triangle_count(), 12 * (2 * 8 - 2));
        assert!(s.indices.iter().all(|&i| (i as usize) < s.verts.len()));

        let (min, max) = s.aabb();
        assert!(min.cmple(Vec3::splat(-0.9)).all());
        assert!(max.cmpge(Vec3::splat(0.9)).all());
    }

    #[test]
    fn test_triangle_soup_is_seeded() {
        let a = TriMesh::triangle_soup(16, 3);
        let b = TriMesh::triangle_soup(16, 3);

        assert_eq!(a.triangle_count(), 16);
        assert_eq!(a.verts, b.verts);
    }

    #[test]
    fn test_from_positions_rejects_partial_triangle() {
        assert!(matches!(
            TriMesh::from_positions(vec![Vec3::ZERO; 2], vec![0, 1]),
            Err(TriMeshError::NotTriangles(2))
        ));
    }

    #[test]
    fn test_to_mesh_verts() {
        let g = TriMesh::grid(1, 1);
        let verts = g.to_mesh_verts();

        assert_eq!(verts.len(), 4);
        assert_eq!(verts[3].position(), Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(verts[3].normal, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(verts[3].tangent, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(verts[3].uv, [1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_attributes_are_zero() {
        let s = TriMesh::uv_sphere(4, 6);
        let verts = s.to_mesh_verts();

        assert!(verts.iter().all(|v| v.tangent == [0.0; 4] && v.uv == [0.0; 4]));
        assert!(verts.iter().all(|v| v.normal != [0.0; 4]));
    }

    #[test]
    fn test_rejects_partial_uvs() {
        let mut mesh = TriMesh::grid(1, 1);
        mesh.uvs = vec![Vec2::ZERO; 2].into();

        assert!(matches!(
            mesh.validate(),
            Err(TriMeshError::AttributeCount {
                attribute: "TEXCOORD_0",
                count: 2,
                vertices: 4
            })
        ));
    }
}
