use std::sync::Arc;

use glam::Vec4;

use crate::{Bvh, Cwbvh};

/// Borrowed view into the CWBVH arrays of a registered BVH, meant for
/// zero-copy uploads.
///
/// The view shares ownership of the BVH, so its data stays valid for as long
/// as the view lives, even if the handle gets destroyed in the meantime.
#[derive(Clone, Debug)]
pub struct CwbvhExport {
    bvh: Arc<Bvh>,
}

impl CwbvhExport {
    /// Returns `None` if given BVH was built without the CWBVH.
    pub fn new(bvh: Arc<Bvh>) -> Option<Self> {
        bvh.has_cwbvh().then_some(Self { bvh })
    }

    pub fn nodes(&self) -> &[Vec4] {
        self.cwbvh().map(Cwbvh::nodes).unwrap_or_default()
    }

    pub fn triangles(&self) -> &[Vec4] {
        self.cwbvh().map(Cwbvh::triangles).unwrap_or_default()
    }

    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.nodes())
    }

    pub fn triangles_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.triangles())
    }

    pub fn nodes_size_bytes(&self) -> usize {
        self.nodes_bytes().len()
    }

    pub fn tris_size_bytes(&self) -> usize {
        self.triangles_bytes().len()
    }

    pub fn bvh(&self) -> &Arc<Bvh> {
        &self.bvh
    }

    fn cwbvh(&self) -> Option<&Cwbvh> {
        self.bvh.cwbvh()
    }
}
