use std::sync::Arc;

use derivative::Derivative;

use crate::buffers::{Bindable, StorageBuffer};
use crate::{CwbvhExport, CwbvhUpload};

/// CWBVH living on the GPU, as two storage buffers: nodes and triangles.
///
/// Binds them at `binding` and `binding + 1`, matching the layout expected by
/// the intersection shader.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct GpuBvh {
    #[derivative(Debug = "ignore")]
    device: Arc<wgpu::Device>,
    #[derivative(Debug = "ignore")]
    queue: Arc<wgpu::Queue>,
    nodes: StorageBuffer,
    triangles: StorageBuffer,
    generation: u32,
}

impl GpuBvh {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let nodes = StorageBuffer::new(&device, "cwbvh_nodes", 0);
        let triangles = StorageBuffer::new(&device, "cwbvh_triangles", 0);

        Self {
            device,
            queue,
            nodes,
            triangles,
            generation: 0,
        }
    }

    /// Returns whether any CWBVH has been uploaded yet.
    pub fn is_uploaded(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Returns a counter bumped whenever the underlying buffers get
    /// reallocated, i.e. when bind groups have to be recreated.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn nodes(&self) -> &StorageBuffer {
        &self.nodes
    }

    pub fn triangles(&self) -> &StorageBuffer {
        &self.triangles
    }
}

impl CwbvhUpload for GpuBvh {
    fn upload(&mut self, cwbvh: &CwbvhExport) {
        let nodes_reallocated =
            self.nodes.write(&self.device, &self.queue, cwbvh.nodes_bytes());

        let triangles_reallocated = self.triangles.write(
            &self.device,
            &self.queue,
            cwbvh.triangles_bytes(),
        );

        if nodes_reallocated || triangles_reallocated {
            self.generation += 1;
        }
    }
}

impl Bindable for GpuBvh {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource<'_>)> {
        self.nodes
            .bind(binding)
            .into_iter()
            .chain(self.triangles.bind(binding + 1))
            .collect()
    }
}
