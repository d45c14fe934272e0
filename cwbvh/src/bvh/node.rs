use super::BvhPrimitivesRef;
use crate::BoundingBox;

#[derive(Clone, Copy, Debug)]
pub enum BvhNode {
    Internal {
        bounds: BoundingBox,
        primitives_ref: BvhPrimitivesRef,
        left_id: BvhNodeId,
        right_id: BvhNodeId,
    },

    Leaf {
        bounds: BoundingBox,
        primitives_ref: BvhPrimitivesRef,
    },
}

impl BvhNode {
    pub fn bounds(&self) -> BoundingBox {
        match self {
            BvhNode::Internal { bounds, .. } => *bounds,
            BvhNode::Leaf { bounds, .. } => *bounds,
        }
    }

    pub fn primitives_ref(&self) -> BvhPrimitivesRef {
        match self {
            BvhNode::Internal { primitives_ref, .. } => *primitives_ref,
            BvhNode::Leaf { primitives_ref, .. } => *primitives_ref,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    pub fn sah_cost(&self) -> f32 {
        if let BvhNode::Leaf {
            bounds,
            primitives_ref,
        } = self
        {
            (primitives_ref.len() as f32) * bounds.half_area()
        } else {
            0.0
        }
    }
}

impl Default for BvhNode {
    fn default() -> Self {
        BvhNode::Leaf {
            bounds: Default::default(),
            primitives_ref: Default::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BvhNodeId(u32);

impl BvhNodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn root() -> Self {
        Self::new(0)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}
