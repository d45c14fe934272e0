use glam::{vec4, Vec4};

use crate::BVH_FAR;

/// Closest intersection found by a ray.
#[repr(C)]
#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct Hit {
    /// Distance along the (normalized) ray; [`BVH_FAR`] when nothing was hit.
    pub t: f32,

    /// Barycentric coordinate of the hit point, weight of the second vertex.
    pub u: f32,

    /// Barycentric coordinate of the hit point, weight of the third vertex.
    pub v: f32,

    /// Index of the hit triangle within the original triangle soup.
    pub prim: u32,

    /// Number of nodes visited while looking for this hit; diagnostics only.
    pub steps: u32,
}

impl Hit {
    pub fn none() -> Self {
        Self {
            t: BVH_FAR,
            u: 0.0,
            v: 0.0,
            prim: u32::MAX,
            steps: 0,
        }
    }

    pub fn is_some(&self) -> bool {
        self.t < BVH_FAR
    }

    pub fn is_none(&self) -> bool {
        !self.is_some()
    }

    /// Packs this hit into the format written by the intersection shader.
    ///
    /// Traversal steps are dropped.
    pub fn pack(&self) -> Vec4 {
        vec4(self.t, self.u, self.v, f32::from_bits(self.prim))
    }

    pub fn unpack(d0: Vec4) -> Self {
        Self {
            t: d0.x,
            u: d0.y,
            v: d0.z,
            prim: d0.w.to_bits(),
            steps: 0,
        }
    }
}

impl Default for Hit {
    fn default() -> Self {
        Self::none()
    }
}
