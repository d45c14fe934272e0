use super::{BvhNode, BvhNodeId, BvhNodes, BvhPrimitives};
use crate::{Axis, BoundingBox};

/// Splits every leaf of given tree until each one holds a single primitive.
///
/// The wide format can address at most a few triangles per leaf, so this has
/// to run before the tree gets collapsed; primitives are only reordered within
/// their leaf, so ranges referenced by the original tree stay valid.
pub fn run(nodes: &mut BvhNodes, primitives: &mut BvhPrimitives) {
    let mut stack: Vec<_> = (0..nodes.len() as u32)
        .map(BvhNodeId::new)
        .filter(|&node_id| {
            nodes[node_id].is_leaf()
                && nodes[node_id].primitives_ref().len() > 1
        })
        .collect();

    while let Some(node_id) = stack.pop() {
        let BvhNode::Leaf {
            bounds,
            primitives_ref,
        } = nodes[node_id]
        else {
            unreachable!();
        };

        let primitives_data = primitives.get_mut(primitives_ref);
        let pivot = primitives_data.len() / 2;

        let centroid_bb: BoundingBox = primitives_data
            .iter()
            .map(|primitive| primitive.center)
            .collect();

        let extent = centroid_bb.extent();

        let axis = Axis::all()
            .max_by(|a, b| extent[*a].total_cmp(&extent[*b]))
            .unwrap_or(Axis::X);

        primitives_data.select_nth_unstable_by(pivot, |a, b| {
            a.center[axis].total_cmp(&b.center[axis])
        });

        let (left_primitives_ref, right_primitives_ref) =
            primitives_ref.split_at(pivot);

        let left_id = nodes.add(BvhNode::Leaf {
            bounds: primitives.bounds(left_primitives_ref),
            primitives_ref: left_primitives_ref,
        });

        let right_id = nodes.add(BvhNode::Leaf {
            bounds: primitives.bounds(right_primitives_ref),
            primitives_ref: right_primitives_ref,
        });

        nodes[node_id] = BvhNode::Internal {
            bounds,
            primitives_ref,
            left_id,
            right_id,
        };

        if left_primitives_ref.len() > 1 {
            stack.push(left_id);
        }

        if right_primitives_ref.len() > 1 {
            stack.push(right_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::vec4;

    use super::*;
    use crate::bvh::{builder, BvhPrimitive};
    use crate::BvhConfig;

    #[test]
    fn splits_down_to_single_primitives() {
        let items = (0..37)
            .map(|i| {
                let offset = vec4((i % 3) as f32, 0.0, 0.0, 0.0);

                BvhPrimitive::new(
                    i,
                    [
                        offset,
                        offset + vec4(1.0, 0.0, 0.0, 0.0),
                        offset + vec4(0.0, 1.0, 0.0, 0.0),
                    ],
                )
            })
            .collect();

        let mut nodes = BvhNodes::default();
        let mut primitives = BvhPrimitives::new(items);

        builder::run(&mut nodes, &mut primitives, BvhConfig::default());

        let primary = nodes.clone();

        run(&mut nodes, &mut primitives);

        let leaves = builder::leaves(&nodes);

        assert_eq!(37, leaves.len());
        assert!(leaves.iter().all(|leaf| leaf.len() == 1));

        let mut prims: Vec<_> = leaves
            .iter()
            .map(|&leaf| primitives.get(leaf)[0].triangle.prim)
            .collect();

        prims.sort();

        assert_eq!((0..37).collect::<Vec<_>>(), prims);

        // Leaves of the original tree must still bound their primitives
        for leaf in builder::leaves(&primary) {
            let leaf_node = primary
                .leaves()
                .find(|node| node.primitives_ref() == leaf)
                .unwrap();

            assert!(leaf_node
                .bounds()
                .contains(&primitives.bounds(leaf), 0.0));
        }
    }
}
