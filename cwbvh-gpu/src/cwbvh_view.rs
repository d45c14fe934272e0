use glam::{uvec2, vec3, UVec2, Vec2Swizzles, Vec3, Vec4, Vec4Swizzles};
use spirv_std::arch::IndexUnchecked;

use crate::{exp2i, sign_extend_byte, Ray, U32Ext, CWBVH_NODE_BLOCKS};

/// Read-only view into the CWBVH node buffer.
///
/// Each node spans five `Vec4`s:
///
/// - `n0.xyz` = origin of the quantization grid,
/// - `n0.w` = signed exponents of the grid scale (one byte per axis) and the
///   inner-child mask (fourth byte),
/// - `n1.x` = index of the first child node,
/// - `n1.y` = index of the first triangle,
/// - `n1.zw` = child metadata (one byte per child),
/// - `n2`, `n3`, `n4` = quantized child planes (one byte per child per plane),
///   in order: lo-x, lo-y, lo-z, hi-x, hi-y, hi-z.
#[derive(Clone, Copy)]
pub struct CwbvhView<'a> {
    buffer: &'a [Vec4],
}

impl<'a> CwbvhView<'a> {
    pub fn new(buffer: &'a [Vec4]) -> Self {
        Self { buffer }
    }

    pub fn get(&self, node_idx: u32) -> CwbvhNodeBlocks {
        let ptr = (node_idx as usize) * CWBVH_NODE_BLOCKS;

        unsafe {
            CwbvhNodeBlocks([
                *self.buffer.index_unchecked(ptr),
                *self.buffer.index_unchecked(ptr + 1),
                *self.buffer.index_unchecked(ptr + 2),
                *self.buffer.index_unchecked(ptr + 3),
                *self.buffer.index_unchecked(ptr + 4),
            ])
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len() / CWBVH_NODE_BLOCKS
    }
}

/// Raw blocks of a single CWBVH node.
#[derive(Clone, Copy)]
pub struct CwbvhNodeBlocks(pub [Vec4; 5]);

impl CwbvhNodeBlocks {
    pub fn origin(&self) -> Vec3 {
        self.0[0].xyz()
    }

    /// Returns the per-axis scale of the quantization grid.
    pub fn scale(&self) -> Vec3 {
        let e = self.0[0].w.to_bits();

        vec3(
            exp2i(sign_extend_byte(e)),
            exp2i(sign_extend_byte(e >> 8)),
            exp2i(sign_extend_byte(e >> 16)),
        )
    }

    pub fn imask(&self) -> u32 {
        self.0[0].w.to_bits() >> 24
    }

    pub fn child_base_idx(&self) -> u32 {
        self.0[1].x.to_bits()
    }

    pub fn triangle_base_idx(&self) -> u32 {
        self.0[1].y.to_bits()
    }

    /// Returns metadata of children `half * 4 .. half * 4 + 4`.
    pub fn meta4(&self, half: u32) -> u32 {
        if half == 0 {
            self.0[1].z.to_bits()
        } else {
            self.0[1].w.to_bits()
        }
    }

    /// Returns quantized planes of children `half * 4 .. half * 4 + 4`; each
    /// axis comes as `(lo, hi)` with one byte per child.
    pub fn planes4(&self, half: u32) -> (UVec2, UVec2, UVec2) {
        let [_, _, n2, n3, n4] = self.0;

        if half == 0 {
            (
                uvec2(n2.x.to_bits(), n3.z.to_bits()),
                uvec2(n2.z.to_bits(), n4.x.to_bits()),
                uvec2(n3.x.to_bits(), n4.z.to_bits()),
            )
        } else {
            (
                uvec2(n2.y.to_bits(), n3.w.to_bits()),
                uvec2(n2.w.to_bits(), n4.y.to_bits()),
                uvec2(n3.y.to_bits(), n4.w.to_bits()),
            )
        }
    }

    /// Tests the ray against all children of this node and returns the
    /// hit-mask: bits `24..32` select intersected inner children (in
    /// octant-adjusted order), bits `0..24` select triangles relative to
    /// [`Self::triangle_base_idx()`].
    pub fn intersect(&self, ray: Ray, oct_inv4: u32, max_t: f32) -> u32 {
        let inv_dir = ray.inv_direction();
        let adjusted_inv_dir = self.scale() * inv_dir;
        let adjusted_origin = (self.origin() - ray.origin()) * inv_dir;

        let mut hit_mask = 0;
        let mut half = 0;

        while half < 2 {
            let meta4 = self.meta4(half);
            let is_inner4 = (meta4 & (meta4 << 1)) & 0x10101010;
            let inner_mask4 = (is_inner4 >> 4) * 0xff;
            let bit_index4 = (meta4 ^ (oct_inv4 & inner_mask4)) & 0x1f1f1f1f;
            let child_bits4 = (meta4 >> 5) & 0x07070707;

            let (x, y, z) = self.planes4(half);

            // When the ray goes in the negative direction on some axis, the
            // `hi` plane is the one it enters through
            let x = if inv_dir.x < 0.0 { x.yx() } else { x };
            let y = if inv_dir.y < 0.0 { y.yx() } else { y };
            let z = if inv_dir.z < 0.0 { z.yx() } else { z };

            let mut child = 0;

            while child < 4 {
                let q_min = vec3(
                    x.x.byte(child) as f32,
                    y.x.byte(child) as f32,
                    z.x.byte(child) as f32,
                );

                let q_max = vec3(
                    x.y.byte(child) as f32,
                    y.y.byte(child) as f32,
                    z.y.byte(child) as f32,
                );

                let t_min3 = q_min * adjusted_inv_dir + adjusted_origin;
                let t_max3 = q_max * adjusted_inv_dir + adjusted_origin;
                let t_min = t_min3.max_element().max(0.0);
                let t_max = t_max3.min_element().min(max_t);

                if t_min <= t_max {
                    let child_bits = child_bits4.byte(child);
                    let bit_index = bit_index4.byte(child);

                    hit_mask |= child_bits << bit_index;
                }

                child += 1;
            }

            half += 1;
        }

        hit_mask
    }
}
