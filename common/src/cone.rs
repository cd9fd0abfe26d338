use crate::vec3::Vec3;

/// Normal cone of a meshlet, for backface cone culling.
/// A meshlet is invisible from a camera at `p` when
/// `dot(normalize(apex - p), axis) >= cutoff`.
#[derive(Debug, Default, Clone, Copy, bincode::Decode, bincode::Encode, PartialEq)]
pub struct NormalCone {
    apex: Vec3,
    axis: Vec3,
    cutoff: f32,
}

impl NormalCone {
    pub fn new(apex: glam::Vec3, axis: glam::Vec3, cutoff: f32) -> Self {
        Self {
            apex: apex.into(),
            axis: axis.into(),
            cutoff,
        }
    }
    pub fn apex(&self) -> glam::Vec3 {
        self.apex.0
    }
    pub fn axis(&self) -> glam::Vec3 {
        self.axis.0
    }
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }
    pub fn packed(&self) -> glam::Vec4 {
        (self.axis.0, self.cutoff).into()
    }

    pub fn is_backfacing(&self, camera: glam::Vec3) -> bool {
        (self.apex() - camera)
            .normalize_or_zero()
            .dot(self.axis())
            >= self.cutoff
    }
}
