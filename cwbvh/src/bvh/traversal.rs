use super::{BvhNode, BvhNodeId, BvhNodes, BvhPrimitives};
use crate::gpu::{Hit, Ray};

/// Finds the closest hit by walking the binary tree, near child first.
pub fn intersect(
    nodes: &BvhNodes,
    primitives: &BvhPrimitives,
    ray: Ray,
) -> Hit {
    let mut hit = Hit::none();
    let mut stack = Vec::with_capacity(64);

    let root = nodes.root().bounds();
    let root_distance = ray.distance_to_aabb(root.min(), root.max());

    if root_distance < hit.t {
        stack.push((BvhNodeId::root(), root_distance));
    }

    while let Some((node_id, distance)) = stack.pop() {
        if distance >= hit.t {
            continue;
        }

        hit.steps += 1;

        match nodes[node_id] {
            BvhNode::Internal {
                left_id, right_id, ..
            } => {
                let left = nodes[left_id].bounds();
                let right = nodes[right_id].bounds();

                let mut near =
                    (left_id, ray.distance_to_aabb(left.min(), left.max()));

                let mut far =
                    (right_id, ray.distance_to_aabb(right.min(), right.max()));

                if far.1 < near.1 {
                    (near, far) = (far, near);
                }

                if far.1 < hit.t {
                    stack.push(far);
                }

                if near.1 < hit.t {
                    stack.push(near);
                }
            }

            BvhNode::Leaf { primitives_ref, .. } => {
                for primitive in primitives.get(primitives_ref) {
                    primitive.triangle.hit(ray, &mut hit);
                }
            }
        }
    }

    hit
}
