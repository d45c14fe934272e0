use glam::{uvec2, UVec2, Vec3};

use crate::{
    safe_rcp, CwbvhView, Hit, TraversalStack, TrianglesView, U32Ext,
};

#[derive(Copy, Clone, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
}

impl Ray {
    /// Creates a ray; the direction gets normalized, so all distances are
    /// expressed in world units.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let direction = direction.normalize_or_zero();

        Self {
            origin,
            direction,
            inv_direction: Vec3::new(
                safe_rcp(direction.x),
                safe_rcp(direction.y),
                safe_rcp(direction.z),
            ),
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn inv_direction(&self) -> Vec3 {
        self.inv_direction
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Returns the "inverse octant" of this ray, replicated on all four bytes.
    ///
    /// For each axis the ray travels in the positive direction, the matching
    /// bit (x = 4, y = 2, z = 1) is set; xor-ing this with a child's slot gives
    /// a bit index that makes the nearest children get visited first.
    pub fn octant_inv4(&self) -> u32 {
        let oct = ((self.inv_direction.x < 0.0) as u32) << 2
            | ((self.inv_direction.y < 0.0) as u32) << 1
            | (self.inv_direction.z < 0.0) as u32;

        (7 - oct) * 0x01010101
    }

    /// Returns distance to given bounding box or [`f32::MAX`] if the ray
    /// misses it.
    pub fn distance_to_aabb(&self, aabb_min: Vec3, aabb_max: Vec3) -> f32 {
        let hit_min = (aabb_min - self.origin) * self.inv_direction;
        let hit_max = (aabb_max - self.origin) * self.inv_direction;

        let tmin = hit_min.min(hit_max).max_element();
        let tmax = hit_min.max(hit_max).min_element();

        if tmax >= tmin && tmax >= 0.0 {
            tmin
        } else {
            f32::MAX
        }
    }

    /// Traces this ray through a compressed wide BVH and returns its closest
    /// hit.
    ///
    /// Nodes are visited in the order given by their hit-masks, which - thanks
    /// to the octant encoding - means near children come before far ones.
    pub fn trace_cwbvh(
        self,
        nodes: CwbvhView,
        triangles: TrianglesView,
    ) -> Hit {
        let mut hit = Hit::none();

        if nodes.len() == 0 {
            return hit;
        }

        let oct_inv4 = self.octant_inv4();
        let mut stack = TraversalStack::new();

        // Group of nodes yet-to-be-visited: `x` is the index of the first
        // child, `y` holds hit-bits (24..32) and the inner-child mask (0..8);
        // the root is encoded as a group with a single hit-bit set
        let mut node_group = uvec2(0, 0x80000000);

        loop {
            let hits = node_group.y;
            let child_bit_index = hits.first_bit_high();

            node_group.y &= !(1 << child_bit_index);

            if node_group.y & 0xff000000 != 0 {
                stack.push(node_group);
            }

            let slot_index = (child_bit_index - 24) ^ (oct_inv4 & 0xff);

            let relative_index =
                (hits & !(0xffffffff_u32 << slot_index)).count_ones();

            let node = nodes.get(node_group.x + relative_index);
            let hit_mask = node.intersect(self, oct_inv4, hit.t);

            hit.steps += 1;

            node_group = uvec2(
                node.child_base_idx(),
                (hit_mask & 0xff000000) | node.imask(),
            );

            let mut triangle_group: UVec2 =
                uvec2(node.triangle_base_idx(), hit_mask & 0x00ffffff);

            while triangle_group.y != 0 {
                let triangle_bit_index = triangle_group.y.first_bit_high();

                triangle_group.y &= !(1 << triangle_bit_index);

                triangles
                    .get(triangle_group.x + triangle_bit_index)
                    .hit(self, &mut hit);
            }

            if node_group.y & 0xff000000 == 0 {
                if let Some(group) = stack.pop() {
                    node_group = group;
                } else {
                    break;
                }
            }
        }

        hit
    }
}
