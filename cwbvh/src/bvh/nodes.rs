use std::ops;

use super::{BvhNode, BvhNodeId};

#[derive(Clone, Debug)]
pub struct BvhNodes {
    nodes: Vec<BvhNode>,
}

impl BvhNodes {
    pub fn add(&mut self, node: BvhNode) -> BvhNodeId {
        self.nodes.push(node);

        BvhNodeId::new((self.nodes.len() - 1) as u32)
    }

    pub fn set_root(&mut self, node: BvhNode) {
        self[BvhNodeId::root()] = node;
    }

    pub fn root(&self) -> &BvhNode {
        &self[BvhNodeId::root()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    pub fn leaves(&self) -> impl Iterator<Item = &BvhNode> + '_ {
        self.nodes.iter().filter(|node| node.is_leaf())
    }
}

impl Default for BvhNodes {
    fn default() -> Self {
        Self {
            nodes: vec![BvhNode::default()],
        }
    }
}

impl ops::Index<BvhNodeId> for BvhNodes {
    type Output = BvhNode;

    fn index(&self, index: BvhNodeId) -> &Self::Output {
        &self.nodes[index.get() as usize]
    }
}

impl ops::IndexMut<BvhNodeId> for BvhNodes {
    fn index_mut(&mut self, index: BvhNodeId) -> &mut Self::Output {
        &mut self.nodes[index.get() as usize]
    }
}
