use std::collections::VecDeque;

use super::{BvhNode, BvhNodeId, BvhNodes, BvhPrimitive, BvhPrimitives};
use crate::{Axis, BoundingBox, BvhConfig};

const BINS: usize = 8;

/// Builds a binary BVH over all of `primitives` using binned SAH, reordering
/// the primitives so that each leaf covers a contiguous range of them.
pub fn run(
    nodes: &mut BvhNodes,
    primitives: &mut BvhPrimitives,
    config: BvhConfig,
) {
    let primitives_ref = primitives.all_ref();

    nodes.set_root(BvhNode::Leaf {
        bounds: primitives.bounds(primitives_ref),
        primitives_ref,
    });

    let mut stack = VecDeque::from_iter([BvhNodeId::root()]);

    while let Some(node_id) = stack.pop_front() {
        if let Some((left_id, right_id)) =
            balance(nodes, primitives, node_id, config)
        {
            stack.push_back(left_id);
            stack.push_back(right_id);
        }
    }
}

#[inline(always)]
fn balance(
    nodes: &mut BvhNodes,
    primitives: &mut BvhPrimitives,
    node_id: BvhNodeId,
    config: BvhConfig,
) -> Option<(BvhNodeId, BvhNodeId)> {
    let node = nodes[node_id];
    let primitives_ref = node.primitives_ref();

    if primitives_ref.len() <= config.max_leaf_size {
        return None;
    }

    let plane = find_splitting_plane(primitives.get(primitives_ref))?;

    if plane.split_cost >= node.sah_cost() {
        return None;
    }

    Some(split(nodes, primitives, node_id, plane))
}

#[inline(always)]
fn find_splitting_plane(primitives: &[BvhPrimitive]) -> Option<SplittingPlane> {
    if primitives.len() <= 1 {
        return None;
    }

    let centroid_bb: BoundingBox =
        primitives.iter().map(|primitive| primitive.center).collect();

    let mut bins = [[Bin::default(); BINS]; 3];

    for primitive in primitives {
        for axis in Axis::all() {
            if let Some(bin_idx) = bin_index(&centroid_bb, axis, primitive) {
                let bin = &mut bins[axis as usize][bin_idx];

                bin.count += 1;
                bin.bounds += primitive.bounds;
            }
        }
    }

    // ---

    let mut left_areas = [[0.0; BINS - 1]; 3];
    let mut right_areas = [[0.0; BINS - 1]; 3];
    let mut left_counts = [[0; BINS - 1]; 3];
    let mut right_counts = [[0; BINS - 1]; 3];

    for axis in 0..3 {
        let mut left_bb = BoundingBox::default();
        let mut right_bb = BoundingBox::default();
        let mut left_count = 0;
        let mut right_count = 0;

        for i in 0..(BINS - 1) {
            let left_bin = bins[axis][i];

            left_count += left_bin.count;
            left_counts[axis][i] = left_count;
            left_bb += left_bin.bounds;
            left_areas[axis][i] = left_bb.half_area();

            // ---

            let right_bin = bins[axis][BINS - 1 - i];

            right_count += right_bin.count;
            right_counts[axis][BINS - 2 - i] = right_count;
            right_bb += right_bin.bounds;
            right_areas[axis][BINS - 2 - i] = right_bb.half_area();
        }
    }

    // ---

    let mut best: Option<SplittingPlane> = None;

    for axis in Axis::all() {
        if centroid_bb.extent()[axis] <= 0.0 {
            continue;
        }

        let a = axis as usize;

        for i in 0..(BINS - 1) {
            if left_counts[a][i] == 0 || right_counts[a][i] == 0 {
                continue;
            }

            let split_cost = (left_counts[a][i] as f32) * left_areas[a][i]
                + (right_counts[a][i] as f32) * right_areas[a][i];

            let is_current_bin_better =
                best.map_or(true, |best| split_cost < best.split_cost);

            if is_current_bin_better {
                best = Some(SplittingPlane {
                    centroid_bb,
                    split_by: axis,
                    split_at: i,
                    split_cost,
                });
            }
        }
    }

    best
}

/// Returns the bin `primitive` falls into along `axis`, or `None` if all
/// centroids lie on the same plane there.
///
/// Both the cost evaluation and the partitioning go through this function,
/// so a split never leaves either side empty.
fn bin_index(
    centroid_bb: &BoundingBox,
    axis: Axis,
    primitive: &BvhPrimitive,
) -> Option<usize> {
    let extent = centroid_bb.extent()[axis];

    if extent <= 0.0 {
        return None;
    }

    let scale = (BINS as f32) / extent;
    let offset = primitive.center[axis] - centroid_bb.min()[axis];

    Some(((offset * scale) as usize).min(BINS - 1))
}

fn split(
    nodes: &mut BvhNodes,
    primitives: &mut BvhPrimitives,
    node_id: BvhNodeId,
    plane: SplittingPlane,
) -> (BvhNodeId, BvhNodeId) {
    let BvhNode::Leaf {
        bounds,
        primitives_ref,
    } = nodes[node_id]
    else {
        unreachable!();
    };

    let primitives_data = primitives.get_mut(primitives_ref);

    let mut left_prim_idx = 0;
    let mut right_prim_idx = (primitives_data.len() - 1) as i32;

    let mut left_bounds = BoundingBox::default();
    let mut right_bounds = BoundingBox::default();

    while left_prim_idx <= right_prim_idx {
        let primitive = primitives_data[left_prim_idx as usize];

        let goes_left =
            bin_index(&plane.centroid_bb, plane.split_by, &primitive)
                .map_or(false, |bin_idx| bin_idx <= plane.split_at);

        if goes_left {
            left_prim_idx += 1;
            left_bounds += primitive.bounds;
        } else {
            primitives_data
                .swap(left_prim_idx as usize, right_prim_idx as usize);

            right_prim_idx -= 1;
            right_bounds += primitive.bounds;
        }
    }

    let (left_primitives_ref, right_primitives_ref) =
        primitives_ref.split_at(left_prim_idx as usize);

    let left_id = nodes.add(BvhNode::Leaf {
        bounds: left_bounds,
        primitives_ref: left_primitives_ref,
    });

    let right_id = nodes.add(BvhNode::Leaf {
        bounds: right_bounds,
        primitives_ref: right_primitives_ref,
    });

    nodes[node_id] = BvhNode::Internal {
        bounds,
        primitives_ref,
        left_id,
        right_id,
    };

    (left_id, right_id)
}

#[derive(Clone, Copy, Debug)]
struct SplittingPlane {
    centroid_bb: BoundingBox,
    split_by: Axis,
    split_at: usize,
    split_cost: f32,
}

#[derive(Clone, Copy, Default, Debug)]
struct Bin {
    bounds: BoundingBox,
    count: u32,
}

/// Returns ranges of primitives covered by leaves of given tree, in
/// depth-first order.
#[cfg(test)]
pub(crate) fn leaves(nodes: &BvhNodes) -> Vec<super::BvhPrimitivesRef> {
    let mut leaves = Vec::new();
    let mut stack = vec![BvhNodeId::root()];

    while let Some(node_id) = stack.pop() {
        match nodes[node_id] {
            BvhNode::Internal {
                left_id, right_id, ..
            } => {
                stack.push(right_id);
                stack.push(left_id);
            }

            BvhNode::Leaf { primitives_ref, .. } => {
                leaves.push(primitives_ref);
            }
        }
    }

    leaves
}

#[cfg(test)]
mod tests {
    use glam::{vec4, Vec4};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn primitive(prim: u32, center: Vec4) -> BvhPrimitive {
        BvhPrimitive::new(
            prim,
            [
                center + vec4(-0.1, -0.1, 0.0, 0.0),
                center + vec4(0.1, -0.1, 0.0, 0.0),
                center + vec4(0.0, 0.1, 0.0, 0.0),
            ],
        )
    }

    fn build(
        items: Vec<BvhPrimitive>,
        config: BvhConfig,
    ) -> (BvhNodes, BvhPrimitives) {
        let mut nodes = BvhNodes::default();
        let mut primitives = BvhPrimitives::new(items);

        run(&mut nodes, &mut primitives, config);

        (nodes, primitives)
    }

    /// Checks that leaves partition the primitives and every node bounds its
    /// subtree.
    fn assert_valid(nodes: &BvhNodes, primitives: &BvhPrimitives) {
        let mut covered = vec![false; primitives.len()];

        for leaf in leaves(nodes) {
            for idx in leaf.as_range() {
                assert!(!covered[idx], "primitive #{idx} is in two leaves");
                covered[idx] = true;
            }
        }

        assert!(covered.into_iter().all(|covered| covered));

        let mut stack = vec![BvhNodeId::root()];

        while let Some(node_id) = stack.pop() {
            let node = nodes[node_id];

            assert!(node
                .bounds()
                .contains(&primitives.bounds(node.primitives_ref()), 0.0));

            if let BvhNode::Internal {
                left_id, right_id, ..
            } = node
            {
                assert!(nodes[left_id].primitives_ref().len() > 0);
                assert!(nodes[right_id].primitives_ref().len() > 0);

                stack.push(left_id);
                stack.push(right_id);
            }
        }
    }

    #[test]
    fn single_primitive() {
        let (nodes, primitives) = build(
            vec![primitive(0, Vec4::ZERO)],
            BvhConfig::default().with_max_leaf_size(1),
        );

        assert_eq!(1, nodes.len());
        assert!(nodes.root().is_leaf());
        assert_valid(&nodes, &primitives);
    }

    #[test]
    fn separated_clusters() {
        let items = (0..8)
            .map(|i| {
                let x = if i < 4 { -10.0 } else { 10.0 };

                primitive(i, vec4(x, i as f32 * 0.5, 0.0, 0.0))
            })
            .collect();

        let (nodes, primitives) =
            build(items, BvhConfig::default().with_max_leaf_size(4));

        let BvhNode::Internal {
            left_id, right_id, ..
        } = *nodes.root()
        else {
            panic!("root should've been split");
        };

        assert!(nodes[left_id].is_leaf());
        assert!(nodes[right_id].is_leaf());
        assert_eq!(4, nodes[left_id].primitives_ref().len());
        assert_eq!(4, nodes[right_id].primitives_ref().len());
        assert_valid(&nodes, &primitives);
    }

    #[test]
    fn coincident_primitives() {
        let items = (0..32).map(|i| primitive(i, Vec4::ONE)).collect();

        let (nodes, primitives) = build(items, BvhConfig::default());

        assert_eq!(1, nodes.len());
        assert_eq!(32, nodes.root().primitives_ref().len());
        assert_valid(&nodes, &primitives);
    }

    #[test]
    fn random_soup() {
        let mut rng = StdRng::seed_from_u64(1234);

        let items = (0..500)
            .map(|i| {
                let center = vec4(
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                    0.0,
                );

                primitive(i, center)
            })
            .collect();

        let (nodes, primitives) = build(items, BvhConfig::default());

        assert!(nodes.len() > 1);
        assert_valid(&nodes, &primitives);
    }
}
