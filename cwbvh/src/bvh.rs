pub(crate) mod builder;
pub(crate) mod leaf_splitter;
mod node;
mod nodes;
mod primitive;
mod traversal;

use glam::Vec4;

pub use self::node::*;
pub use self::nodes::*;
pub use self::primitive::*;
use crate::gpu::{Hit, Ray};
use crate::{utils, BoundingBox, BvhConfig, Cwbvh, Error, Result};

/// Acceleration structure built out of a single triangle soup.
///
/// Always contains a binary BVH used for CPU queries; when requested, also
/// contains its compressed wide counterpart meant for the GPU.
#[derive(Clone, Debug)]
pub struct Bvh {
    nodes: BvhNodes,
    primitives: BvhPrimitives,
    cwbvh: Option<Cwbvh>,
}

impl Bvh {
    /// Builds a BVH out of the first `triangle_count * 3` vertices; each
    /// consecutive three of them form a triangle (`w` is ignored).
    ///
    /// The vertices are copied, so the caller is free to drop them as soon as
    /// this function returns.
    pub fn build(
        vertices: &[Vec4],
        triangle_count: usize,
        build_cwbvh: bool,
        config: BvhConfig,
    ) -> Result<Self> {
        if triangle_count == 0 {
            return Err(Error::EmptyInput);
        }

        let expected = triangle_count.saturating_mul(3);

        if vertices.len() < expected {
            return Err(Error::NotEnoughVertices {
                expected,
                actual: vertices.len(),
            });
        }

        log::info!(
            "Building BVH; triangles = {}, cwbvh = {}",
            triangle_count,
            build_cwbvh
        );

        let mut primitives = BvhPrimitives::new(
            vertices[..expected]
                .chunks_exact(3)
                .enumerate()
                .map(|(prim, v)| {
                    BvhPrimitive::new(prim as u32, [v[0], v[1], v[2]])
                })
                .collect(),
        );

        let mut nodes = BvhNodes::default();

        utils::measure("bvh.build", || {
            builder::run(&mut nodes, &mut primitives, config);
        });

        let cwbvh = if build_cwbvh {
            let mut wide_nodes = nodes.clone();

            utils::measure("bvh.split-leaves", || {
                leaf_splitter::run(&mut wide_nodes, &mut primitives);
            });

            let cwbvh = utils::measure("bvh.compress", || {
                Cwbvh::build(&wide_nodes, &primitives)
            })?;

            Some(cwbvh)
        } else {
            None
        };

        log::info!(
            "BVH built; nodes = {}, cwbvh-nodes = {}, cwbvh-size = {}",
            nodes.len(),
            cwbvh.as_ref().map_or(0, |cwbvh| cwbvh.node_count()),
            cwbvh.as_ref().map_or(0, |cwbvh| cwbvh.nodes_size_bytes()
                + cwbvh.tris_size_bytes()),
        );

        Ok(Self {
            nodes,
            primitives,
            cwbvh,
        })
    }

    /// Returns the closest hit of given ray, traversing the compressed tree
    /// if `use_cwbvh` is set and the tree was built with it.
    pub fn intersect(&self, ray: Ray, use_cwbvh: bool) -> Hit {
        match &self.cwbvh {
            Some(cwbvh) if use_cwbvh => cwbvh.intersect(ray),
            _ => traversal::intersect(&self.nodes, &self.primitives, ray),
        }
    }

    pub fn cwbvh(&self) -> Option<&Cwbvh> {
        self.cwbvh.as_ref()
    }

    pub fn has_cwbvh(&self) -> bool {
        self.cwbvh.is_some()
    }

    pub fn bounds(&self) -> BoundingBox {
        self.nodes.root().bounds()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives.len()
    }
}
