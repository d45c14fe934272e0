use std::collections::VecDeque;

use glam::{vec3, Vec3, Vec4};

use super::{Cwbvh, CwbvhNode, WideBvh, WideChild, WideNode};
use crate::bvh::BvhPrimitives;
use crate::gpu::{
    exp2i, BVH_STACK_SIZE, CWBVH_BRANCHING, CWBVH_MAX_LEAF_TRIANGLES,
    CWBVH_MAX_NODE_TRIANGLES,
};
use crate::{Axis, BoundingBox, Error, Result};

/// Compresses a wide BVH into the GPU format.
///
/// Nodes are emitted breadth-first, so the inner children of each node end up
/// next to each other (in slot order), starting at the node's child base;
/// triangles of its leaves are laid out the same way, starting at the node's
/// triangle base.
pub fn serialize(wide: &WideBvh, primitives: &BvhPrimitives) -> Result<Cwbvh> {
    let mut nodes = vec![CwbvhNode::default()];
    let mut triangles: Vec<Vec4> = Vec::with_capacity(primitives.len() * 3);
    let mut queue = VecDeque::from_iter([(0, 0, 0)]);

    while let Some((wide_idx, node_idx, depth)) = queue.pop_front() {
        let wide_node = &wide.nodes[wide_idx];

        let (origin, exponents) = quantization_grid(&wide_node.bounds);

        let mut node = CwbvhNode {
            origin,
            exponents,
            child_base_idx: nodes.len() as u32,
            triangle_base_idx: (triangles.len() / 3) as u32,
            ..Default::default()
        };

        let scale = node.scale();

        for (slot, child_idx) in assign_slots(wide_node).into_iter().enumerate()
        {
            let Some(child_idx) = child_idx else {
                continue;
            };

            let child = wide_node.children[child_idx];
            let (lo, hi) = quantize(&child.bounds(), origin, scale);

            node.lo_x[slot] = lo[0];
            node.lo_y[slot] = lo[1];
            node.lo_z[slot] = lo[2];
            node.hi_x[slot] = hi[0];
            node.hi_y[slot] = hi[1];
            node.hi_z[slot] = hi[2];

            match child {
                WideChild::Internal {
                    node_idx: child_wide_idx,
                    ..
                } => {
                    if depth + 1 >= BVH_STACK_SIZE {
                        return Err(Error::TooDeep { depth: depth + 1 });
                    }

                    node.imask |= 1 << slot;
                    node.meta[slot] = (1 << 5) | (24 + slot as u8);

                    queue.push_back((child_wide_idx, nodes.len(), depth + 1));
                    nodes.push(CwbvhNode::default());
                }

                WideChild::Leaf { primitives_ref, .. } => {
                    let count = primitives_ref.len();

                    if count > CWBVH_MAX_LEAF_TRIANGLES {
                        return Err(Error::LeafBudgetExceeded {
                            triangles: count,
                        });
                    }

                    let offset =
                        triangles.len() / 3 - node.triangle_base_idx as usize;

                    if offset + count > CWBVH_MAX_NODE_TRIANGLES {
                        return Err(Error::LeafBudgetExceeded {
                            triangles: offset + count,
                        });
                    }

                    let unary = (1u8 << count) - 1;

                    node.meta[slot] = (unary << 5) | (offset as u8);

                    for primitive in primitives.get(primitives_ref) {
                        triangles.extend(primitive.triangle.serialize());
                    }
                }
            }
        }

        nodes[node_idx] = node;
    }

    Ok(Cwbvh {
        nodes: nodes.iter().flat_map(CwbvhNode::serialize).collect(),
        triangles,
    })
}

/// Chooses origin and per-axis power-of-two scale, so that 255 steps of the
/// scale cover given bounds.
fn quantization_grid(bounds: &BoundingBox) -> (Vec3, [i8; 3]) {
    let extent = bounds.extent();
    let mut exponents = [0; 3];

    for axis in Axis::all() {
        let extent = extent[axis];

        let mut exponent =
            (extent / 255.0).log2().ceil().clamp(-126.0, 127.0) as i32;

        while exponent < 127 && exp2i(exponent) * 255.0 < extent {
            exponent += 1;
        }

        exponents[axis as usize] = exponent as i8;
    }

    (bounds.min(), exponents)
}

/// Quantizes given bounds conservatively: the decoded box always contains the
/// original one.
fn quantize(
    bounds: &BoundingBox,
    origin: Vec3,
    scale: Vec3,
) -> ([u8; 3], [u8; 3]) {
    let lo = ((bounds.min() - origin) / scale).floor();
    let hi = ((bounds.max() - origin) / scale).ceil();

    let lo = lo.clamp(Vec3::ZERO, Vec3::splat(255.0));
    let hi = hi.clamp(Vec3::ZERO, Vec3::splat(255.0));

    (
        [lo.x as u8, lo.y as u8, lo.z as u8],
        [hi.x as u8, hi.y as u8, hi.z as u8],
    )
}

/// Assigns children to slots so that, for each ray octant, the child nearest
/// along that octant's direction lands in the slot visited first.
///
/// Slot `s` corresponds to direction with negative x when `s & 4`, negative y
/// when `s & 2` and negative z when `s & 1`.
fn assign_slots(node: &WideNode) -> [Option<usize>; CWBVH_BRANCHING] {
    let center = node.bounds.center();

    let mut costs = [[0.0; CWBVH_BRANCHING]; CWBVH_BRANCHING];

    for (slot, costs) in costs.iter_mut().enumerate() {
        let dir = vec3(
            if slot & 4 != 0 { -1.0 } else { 1.0 },
            if slot & 2 != 0 { -1.0 } else { 1.0 },
            if slot & 1 != 0 { -1.0 } else { 1.0 },
        );

        for (child_idx, child) in node.children.iter().enumerate() {
            costs[child_idx] = (child.bounds().center() - center).dot(dir);
        }
    }

    let mut slots = [None; CWBVH_BRANCHING];
    let mut assigned = [false; CWBVH_BRANCHING];

    loop {
        let mut best: Option<(usize, usize, f32)> = None;

        for slot in 0..CWBVH_BRANCHING {
            if slots[slot].is_some() {
                continue;
            }

            for child_idx in 0..node.children.len() {
                if assigned[child_idx] {
                    continue;
                }

                let cost = costs[slot][child_idx];

                if best.map_or(true, |(_, _, best)| cost < best) {
                    best = Some((slot, child_idx, cost));
                }
            }
        }

        let Some((slot, child_idx, _)) = best else {
            break;
        };

        slots[slot] = Some(child_idx);
        assigned[child_idx] = true;
    }

    slots
}
