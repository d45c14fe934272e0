use fxhash::FxHashSet;

use super::{Cwbvh, CwbvhNode};
use crate::gpu::{
    BVH_STACK_SIZE, CWBVH_BRANCHING, CWBVH_MAX_LEAF_TRIANGLES,
    CWBVH_MAX_NODE_TRIANGLES,
};
use crate::BoundingBox;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CwbvhStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub triangle_count: usize,
    pub max_depth: usize,
}

#[derive(Default)]
struct ValidationCtx {
    discovered_nodes: FxHashSet<u32>,
    discovered_triangles: FxHashSet<u32>,
    stats: CwbvhStats,
}

impl Cwbvh {
    /// Walks the whole tree and panics if it breaks any of the invariants the
    /// traversal relies on:
    ///
    /// - every node and every triangle is reachable exactly once,
    /// - leaves hold at most [`CWBVH_MAX_LEAF_TRIANGLES`] triangles and
    ///   nodes reference at most [`CWBVH_MAX_NODE_TRIANGLES`],
    /// - the inner-child mask agrees with child metadata,
    /// - triangles lie within their (dequantized) leaf bounds,
    /// - the tree is shallow enough for the traversal stack.
    pub fn validate(&self) -> CwbvhStats {
        let mut ctx = ValidationCtx::default();

        if self.node_count() > 0 {
            self.validate_node(0, 0, &mut ctx);
        }

        assert_eq!(self.node_count(), ctx.discovered_nodes.len());
        assert_eq!(self.triangle_count(), ctx.discovered_triangles.len());
        assert!(ctx.stats.max_depth < BVH_STACK_SIZE);

        ctx.stats.node_count = self.node_count();
        ctx.stats.triangle_count = self.triangle_count();
        ctx.stats
    }

    fn validate_node(
        &self,
        node_idx: u32,
        depth: usize,
        ctx: &mut ValidationCtx,
    ) {
        assert!(
            ctx.discovered_nodes.insert(node_idx),
            "node #{node_idx} is reachable more than once"
        );

        ctx.stats.max_depth = ctx.stats.max_depth.max(depth);

        let node = self.node(node_idx);

        assert!(node.origin.is_finite());

        for slot in 0..CWBVH_BRANCHING {
            if node.is_empty_slot(slot) {
                continue;
            }

            let meta = node.meta[slot];
            let is_inner = (meta & 0b11111) >= 24;

            assert_eq!(node.is_inner_slot(slot), is_inner);

            if is_inner {
                let slot_idx = (meta & 0b11111) as u32 - 24;
                let relative_idx = (node.imask as u32
                    & !(0xffffffff << slot_idx))
                    .count_ones();

                self.validate_node(
                    node.child_base_idx + relative_idx,
                    depth + 1,
                    ctx,
                );
            } else {
                self.validate_leaf(&node, slot, ctx);
            }
        }
    }

    fn validate_leaf(
        &self,
        node: &CwbvhNode,
        slot: usize,
        ctx: &mut ValidationCtx,
    ) {
        let meta = node.meta[slot];
        let offset = (meta & 0b11111) as u32;
        let unary = meta >> 5;
        let count = unary.count_ones();

        assert!(matches!(unary, 0b001 | 0b011 | 0b111));
        assert!(count as usize <= CWBVH_MAX_LEAF_TRIANGLES);
        assert!((offset + count) as usize <= CWBVH_MAX_NODE_TRIANGLES);

        let (lo, hi) = node.child_bounds(slot);
        let leaf_bounds = BoundingBox::new(lo, hi);

        ctx.stats.leaf_count += 1;

        for i in 0..count {
            let triangle_idx = node.triangle_base_idx + offset + i;

            assert!(
                ctx.discovered_triangles.insert(triangle_idx),
                "triangle #{triangle_idx} is referenced more than once"
            );

            let triangle = self.triangle(triangle_idx);
            let bounds: BoundingBox =
                triangle.positions().into_iter().collect();

            let magnitude = bounds.min().abs().max(bounds.max().abs());
            let epsilon = 1e-5 * (1.0 + magnitude.max_element());

            assert!(
                leaf_bounds.contains(&bounds, epsilon),
                "triangle #{triangle_idx} doesn't fit its leaf: \
                 {bounds:?} vs {leaf_bounds:?}"
            );
        }
    }
}
