mod node;
mod serializer;
mod validator;
mod wide_node;

use std::mem;

use glam::Vec4;

pub use self::node::*;
pub use self::validator::*;
pub(crate) use self::wide_node::*;
use crate::bvh::{BvhNodes, BvhPrimitives};
use crate::gpu::{
    CwbvhView, Hit, Ray, Triangle, TrianglesView, CWBVH_NODE_BLOCKS,
    CWBVH_TRIANGLE_BLOCKS,
};
use crate::Result;

/// Compressed wide BVH, ready to be uploaded to the GPU.
#[derive(Clone, Debug, Default)]
pub struct Cwbvh {
    nodes: Vec<Vec4>,
    triangles: Vec<Vec4>,
}

impl Cwbvh {
    /// Converts a binary tree whose every leaf holds exactly one primitive.
    pub(crate) fn build(
        nodes: &BvhNodes,
        primitives: &BvhPrimitives,
    ) -> Result<Self> {
        let wide = WideBvh::collapse(nodes);

        serializer::serialize(&wide, primitives)
    }

    pub fn nodes(&self) -> &[Vec4] {
        &self.nodes
    }

    pub fn triangles(&self) -> &[Vec4] {
        &self.triangles
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len() / CWBVH_NODE_BLOCKS
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / CWBVH_TRIANGLE_BLOCKS
    }

    pub fn nodes_size_bytes(&self) -> usize {
        self.nodes.len() * mem::size_of::<Vec4>()
    }

    pub fn tris_size_bytes(&self) -> usize {
        self.triangles.len() * mem::size_of::<Vec4>()
    }

    pub fn node(&self, node_idx: u32) -> CwbvhNode {
        let ptr = (node_idx as usize) * CWBVH_NODE_BLOCKS;

        CwbvhNode::deserialize([
            self.nodes[ptr],
            self.nodes[ptr + 1],
            self.nodes[ptr + 2],
            self.nodes[ptr + 3],
            self.nodes[ptr + 4],
        ])
    }

    pub fn triangle(&self, triangle_idx: u32) -> Triangle {
        let ptr = (triangle_idx as usize) * CWBVH_TRIANGLE_BLOCKS;

        Triangle::deserialize([
            self.triangles[ptr],
            self.triangles[ptr + 1],
            self.triangles[ptr + 2],
        ])
    }

    /// Traces given ray on the CPU, using the same code as the GPU kernel.
    pub fn intersect(&self, ray: Ray) -> Hit {
        ray.trace_cwbvh(
            CwbvhView::new(&self.nodes),
            TrianglesView::new(&self.triangles),
        )
    }
}
