use crate::vec3::Vec3;

#[derive(Debug, Default, Clone, Copy, bincode::Decode, bincode::Encode, PartialEq)]
pub struct BoundingSphere {
    center: Vec3,
    radius: f32,
}

impl BoundingSphere {
    pub fn new(center: glam::Vec3, radius: f32) -> Self {
        Self {
            center: center.into(),
            radius,
        }
    }

    /// Sphere around an axis aligned box, centered on its midpoint and touching its corners.
    pub fn from_aabb(min: glam::Vec3, max: glam::Vec3) -> Self {
        let center = (min + max) * 0.5;
        Self::new(center, center.distance(min))
    }

    /// Sphere around the union of the bounding boxes of `spheres`.
    /// Not minimal, but cheap and never smaller than any input.
    pub fn enclosing<'a>(spheres: impl IntoIterator<Item = &'a BoundingSphere>) -> Self {
        let mut min = glam::Vec3::INFINITY;
        let mut max = glam::Vec3::NEG_INFINITY;

        for s in spheres {
            min = min.min(s.aabb_min());
            max = max.max(s.aabb_max());
        }

        if min.cmpgt(max).any() {
            return Self::default();
        }

        Self::from_aabb(min, max)
    }

    pub fn center(&self) -> glam::Vec3 {
        self.center.0
    }
    pub fn radius(&self) -> f32 {
        self.radius
    }
    pub fn packed(&self) -> glam::Vec4 {
        (self.center.0, self.radius).into()
    }

    pub fn aabb_min(&self) -> glam::Vec3 {
        self.center() - glam::Vec3::splat(self.radius)
    }
    pub fn aabb_max(&self) -> glam::Vec3 {
        self.center() + glam::Vec3::splat(self.radius)
    }

    pub fn inflated(&self, epsilon: f32) -> Self {
        Self::new(self.center(), self.radius + epsilon)
    }

    /// Does this sphere envelop `other`, allowing `tolerance` of floating point slack.
    pub fn contains_sphere(&self, other: &BoundingSphere, tolerance: f32) -> bool {
        self.center().distance(other.center()) + other.radius() <= self.radius + tolerance
    }

    pub fn contains_point(&self, point: glam::Vec3, tolerance: f32) -> bool {
        self.center().distance(point) <= self.radius + tolerance
    }

    pub fn assert_contains_sphere(&self, sphere: &BoundingSphere) {
        let max_dist = self.center().distance(sphere.center()) + sphere.radius();
        assert!(
            max_dist <= self.radius,
            "{self:?} {sphere:?} MAX DIST - {max_dist}"
        )
    }
}
