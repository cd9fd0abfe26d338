/// Vertex record stored in the baked asset.
/// `tangent.w` holds the bitangent sign; only `uv.xy` is read from glTF.
#[repr(C)]
#[derive(
    Debug, Clone, PartialEq, bincode::Decode, bincode::Encode, bytemuck::Pod, bytemuck::Zeroable, Copy,
)]
pub struct MeshVert {
    pub pos: [f32; 4],
    pub normal: [f32; 4],
    pub tangent: [f32; 4],
    pub uv: [f32; 4],
}

impl MeshVert {
    /// Vertex with zero tangent and uv.
    pub fn new(pos: glam::Vec3, normal: glam::Vec3) -> Self {
        Self {
            pos: pos.extend(1.0).into(),
            normal: normal.extend(0.0).into(),
            tangent: [0.0; 4],
            uv: [0.0; 4],
        }
    }

    pub fn position(&self) -> glam::Vec3 {
        glam::Vec4::from(self.pos).truncate()
    }

    pub fn uv(&self) -> glam::Vec2 {
        glam::Vec2::new(self.uv[0], self.uv[1])
    }
}
