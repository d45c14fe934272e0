use super::{pad_size, Bindable};

/// Read-only storage buffer that lives only in VRAM and gets reallocated when
/// the data written into it outgrows it.
#[derive(Debug)]
pub struct StorageBuffer {
    label: String,
    buffer: wgpu::Buffer,
    len: usize,
}

impl StorageBuffer {
    pub fn new(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        size: usize,
    ) -> Self {
        let label = label.as_ref();

        Self {
            label: label.to_owned(),
            buffer: Self::allocate(device, label, size),
            len: 0,
        }
    }

    /// Uploads `data`, growing the buffer beforehand if needed.
    ///
    /// Returns whether the buffer got reallocated, in which case bind groups
    /// referring to it have to be recreated.
    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
    ) -> bool {
        let reallocated = data.len() > self.capacity();

        if reallocated {
            self.buffer = Self::allocate(device, &self.label, data.len());
        }

        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, data);
        }

        self.len = data.len();

        reallocated
    }

    /// Returns the number of bytes written by the latest [`Self::write()`].
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.size() as usize
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    fn allocate(
        device: &wgpu::Device,
        label: &str,
        size: usize,
    ) -> wgpu::Buffer {
        let size = pad_size(size);

        log::debug!("Allocating storage buffer `{label}`; size={size}");

        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            usage: wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::STORAGE,
            size: size as _,
            mapped_at_creation: false,
        })
    }
}

impl Bindable for StorageBuffer {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource<'_>)> {
        let layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let resource = self.buffer.as_entire_binding();

        vec![(layout, resource)]
    }
}
