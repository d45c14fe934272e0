/// Parameters of the BVH builder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BvhConfig {
    /// Nodes with at most this many triangles are never split by the SAH
    /// builder.
    ///
    /// Doesn't affect the CWBVH, which always gets built out of leaves holding
    /// exactly one triangle.
    pub max_leaf_size: usize,
}

impl BvhConfig {
    pub const fn new() -> Self {
        Self { max_leaf_size: 4 }
    }

    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Self {
        self.max_leaf_size = max_leaf_size.max(1);
        self
    }
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self::new()
    }
}
