use std::mem;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::task::Poll;

use glam::Vec4;

use super::pad_size;
use crate::{Error, Result, VertexReadback};

type MapResult = std::result::Result<(), wgpu::BufferAsyncError>;

/// Copies vertices out of a GPU buffer without blocking the caller.
///
/// The copy gets submitted when the readback is created; [`Self::poll()`]
/// only nudges the device and checks whether the staging buffer has been
/// mapped.
pub struct GpuReadback {
    device: Arc<wgpu::Device>,
    staging: wgpu::Buffer,
    size: usize,
    rx: mpsc::Receiver<MapResult>,
}

impl GpuReadback {
    /// Schedules reading `triangle_count * 3` vertices (`vec4<f32>` each)
    /// from the beginning of `source`, which must be `COPY_SRC`.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: &wgpu::Queue,
        source: &wgpu::Buffer,
        triangle_count: usize,
    ) -> Self {
        let size = triangle_count * 3 * mem::size_of::<Vec4>();
        let staging_size = pad_size(size);

        log::debug!("Scheduling vertex readback; size={size}");

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cwbvh_vertex_readback"),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            size: staging_size as _,
            mapped_at_creation: false,
        });

        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cwbvh_vertex_readback"),
            });

        if size > 0 {
            encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size as _);
        }

        queue.submit([encoder.finish()]);

        let (tx, rx) = mpsc::channel();

        staging
            .slice(..staging_size as u64)
            .map_async(wgpu::MapMode::Read, move |result| {
                _ = tx.send(result);
            });

        Self {
            device,
            staging,
            size,
            rx,
        }
    }

    fn read(&self) -> Vec<Vec4> {
        let data = self.staging.slice(..).get_mapped_range();

        let vertices = data[..self.size]
            .chunks_exact(mem::size_of::<Vec4>())
            .map(|chunk| Vec4::from_array(bytemuck::pod_read_unaligned(chunk)))
            .collect();

        drop(data);

        self.staging.unmap();

        vertices
    }
}

impl VertexReadback for GpuReadback {
    fn poll(&mut self) -> Poll<Result<Vec<Vec4>>> {
        self.device.poll(wgpu::Maintain::Poll);

        match self.rx.try_recv() {
            Ok(Ok(())) => Poll::Ready(Ok(self.read())),

            Ok(Err(err)) => Poll::Ready(Err(Error::Transfer(err.to_string()))),

            Err(TryRecvError::Empty) => Poll::Pending,

            Err(TryRecvError::Disconnected) => Poll::Ready(Err(
                Error::Transfer("mapping callback was dropped".into()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use wgpu::util::DeviceExt;

    use super::*;
    use crate::test_utils;

    #[test]
    fn reads_vertices_back() {
        let Some((device, queue)) = test_utils::device() else {
            return;
        };

        let vertices = test_utils::two_triangles();

        let source =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("test_vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC,
            });

        let mut target = GpuReadback::new(device, &queue, &source, 2);
        let actual = test_utils::wait_for(|| target.poll()).unwrap();

        assert_eq!(vertices, actual);
    }

    #[test]
    fn reads_prefix_only() {
        let Some((device, queue)) = test_utils::device() else {
            return;
        };

        let vertices = test_utils::two_triangles();

        let source =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("test_vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC,
            });

        let mut target = GpuReadback::new(device, &queue, &source, 1);
        let actual = test_utils::wait_for(|| target.poll()).unwrap();

        assert_eq!(&vertices[..3], actual);
    }
}
