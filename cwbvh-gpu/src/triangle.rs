use glam::{Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{Hit, Ray, TRIANGLE_EPSILON};

#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,

    /// Index of this triangle within the original triangle soup.
    pub prim: u32,
}

impl Triangle {
    /// Decodes a triangle stored as three `Vec4`s, with the primitive index
    /// packed into `v0.w`.
    pub fn deserialize([d0, d1, d2]: [Vec4; 3]) -> Self {
        Self {
            v0: d0.xyz(),
            v1: d1.xyz(),
            v2: d2.xyz(),
            prim: d0.w.to_bits(),
        }
    }

    pub fn serialize(&self) -> [Vec4; 3] {
        [
            self.v0.extend(f32::from_bits(self.prim)),
            self.v1.extend(0.0),
            self.v2.extend(0.0),
        ]
    }

    pub fn positions(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    pub fn center(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Intersects the ray with this triangle (Möller–Trumbore), updating `hit`
    /// if the intersection is strictly closer than the current one.
    ///
    /// Both faces are hittable; triangles nearly parallel to the ray (or
    /// degenerate ones) are skipped.
    pub fn hit(&self, ray: Ray, hit: &mut Hit) -> bool {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction().cross(edge2);
        let det = edge1.dot(h);

        if det.abs() <= TRIANGLE_EPSILON {
            return false;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin() - self.v0;
        let u = s.dot(h) * inv_det;

        if u < 0.0 || u > 1.0 {
            return false;
        }

        let q = s.cross(edge1);
        let v = ray.direction().dot(q) * inv_det;

        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = edge2.dot(q) * inv_det;

        if t <= 0.0 || t >= hit.t {
            return false;
        }

        hit.t = t;
        hit.u = u;
        hit.v = v;
        hit.prim = self.prim;

        true
    }
}
