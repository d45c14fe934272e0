/// Object that can be attached to a pipeline, e.g. a storage buffer
pub trait Bindable {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource<'_>)>;
}
