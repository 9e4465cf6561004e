//! Rays cast by the CPU preview

use crate::core::types::Vec3;
use super::aabb::Aabb;

/// A ray with a unit direction
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    /// Per-axis reciprocal of `dir` for the slab test
    recip: Vec3,
}

impl Ray {
    /// Create a ray; `dir` is normalized here.
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        let dir = dir.normalize_or_zero();
        Self {
            origin,
            dir,
            recip: dir.recip(),
        }
    }

    /// Point at distance `t` along the ray
    pub fn point(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Distance at which the ray enters `bounds`, zero when it starts inside.
    pub fn hit_box(&self, bounds: &Aabb) -> Option<f32> {
        let a = (bounds.min - self.origin) * self.recip;
        let b = (bounds.max - self.origin) * self.recip;
        let enter = a.min(b).max_element();
        let exit = a.max(b).min_element();
        (enter <= exit && exit >= 0.0).then(|| enter.max(0.0))
    }

    /// Distance to the square patch of the plane `y = height` centred under
    /// the origin of the world, `half_extent` wide in x and z.
    pub fn hit_ground(&self, height: f32, half_extent: f32) -> Option<f32> {
        if self.dir.y == 0.0 {
            return None;
        }
        let t = (height - self.origin.y) / self.dir.y;
        if t <= 0.0 {
            return None;
        }
        let p = self.point(t);
        (p.x.abs() <= half_extent && p.z.abs() <= half_extent).then_some(t)
    }
}
