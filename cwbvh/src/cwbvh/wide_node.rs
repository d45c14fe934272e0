use crate::bvh::{BvhNode, BvhNodeId, BvhNodes, BvhPrimitivesRef};
use crate::gpu::CWBVH_BRANCHING;
use crate::BoundingBox;

#[derive(Clone, Copy, Debug)]
pub enum WideChild {
    Internal {
        bounds: BoundingBox,
        node_idx: usize,
    },

    Leaf {
        bounds: BoundingBox,
        primitives_ref: BvhPrimitivesRef,
    },
}

impl WideChild {
    pub fn bounds(&self) -> BoundingBox {
        match self {
            WideChild::Internal { bounds, .. } => *bounds,
            WideChild::Leaf { bounds, .. } => *bounds,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct WideNode {
    pub bounds: BoundingBox,
    pub children: Vec<WideChild>,
}

/// Uncompressed 8-wide BVH; the root lives at index zero.
#[derive(Clone, Debug)]
pub struct WideBvh {
    pub nodes: Vec<WideNode>,
}

impl WideBvh {
    /// Collapses a binary tree into a wide one by repeatedly pulling up the
    /// grandchildren of the largest internal child, until a node has
    /// [`CWBVH_BRANCHING`] children or only leaves remain.
    pub fn collapse(nodes: &BvhNodes) -> Self {
        let mut wide_nodes = vec![WideNode::default()];
        let mut stack = vec![(BvhNodeId::root(), 0)];

        while let Some((node_id, wide_idx)) = stack.pop() {
            let node = nodes[node_id];

            let mut children = match node {
                BvhNode::Internal {
                    left_id, right_id, ..
                } => vec![left_id, right_id],

                BvhNode::Leaf { .. } => vec![node_id],
            };

            while children.len() < CWBVH_BRANCHING {
                let largest = children
                    .iter()
                    .enumerate()
                    .filter(|(_, child_id)| !nodes[**child_id].is_leaf())
                    .max_by(|(_, a), (_, b)| {
                        let a = nodes[**a].bounds().half_area();
                        let b = nodes[**b].bounds().half_area();

                        a.total_cmp(&b)
                    })
                    .map(|(idx, _)| idx);

                let Some(largest) = largest else {
                    break;
                };

                let BvhNode::Internal {
                    left_id, right_id, ..
                } = nodes[children[largest]]
                else {
                    unreachable!();
                };

                children[largest] = left_id;
                children.push(right_id);
            }

            let mut wide_children = Vec::with_capacity(children.len());

            for child_id in children {
                let child = match nodes[child_id] {
                    BvhNode::Internal { bounds, .. } => {
                        let node_idx = wide_nodes.len();

                        wide_nodes.push(WideNode::default());
                        stack.push((child_id, node_idx));

                        WideChild::Internal { bounds, node_idx }
                    }

                    BvhNode::Leaf {
                        bounds,
                        primitives_ref,
                    } => WideChild::Leaf {
                        bounds,
                        primitives_ref,
                    },
                };

                wide_children.push(child);
            }

            wide_nodes[wide_idx] = WideNode {
                bounds: node.bounds(),
                children: wide_children,
            };
        }

        Self { nodes: wide_nodes }
    }
}

#[cfg(test)]
mod tests {
    use glam::vec4;

    use super::*;
    use crate::bvh::{builder, leaf_splitter, BvhPrimitive, BvhPrimitives};
    use crate::BvhConfig;

    #[test]
    fn collapse() {
        let items = (0..100)
            .map(|i| {
                let offset = vec4(i as f32 * 2.0, (i % 7) as f32, 0.0, 0.0);

                BvhPrimitive::new(
                    i,
                    [
                        offset,
                        offset + vec4(1.0, 0.0, 0.0, 0.0),
                        offset + vec4(0.0, 1.0, 1.0, 0.0),
                    ],
                )
            })
            .collect();

        let mut nodes = BvhNodes::default();
        let mut primitives = BvhPrimitives::new(items);

        builder::run(&mut nodes, &mut primitives, BvhConfig::default());
        leaf_splitter::run(&mut nodes, &mut primitives);

        let target = WideBvh::collapse(&nodes);

        let mut leaves = 0;

        for node in &target.nodes {
            assert!(node.children.len() >= 2);
            assert!(node.children.len() <= CWBVH_BRANCHING);

            for child in &node.children {
                assert!(node.bounds.contains(&child.bounds(), 0.0));

                if let WideChild::Leaf { primitives_ref, .. } = child {
                    assert_eq!(1, primitives_ref.len());
                    leaves += 1;
                }
            }
        }

        assert_eq!(100, leaves);
    }

    #[test]
    fn collapse_single_leaf() {
        let nodes = BvhNodes::default();
        let target = WideBvh::collapse(&nodes);

        assert_eq!(1, target.nodes.len());
        assert_eq!(1, target.nodes[0].children.len());
    }
}
