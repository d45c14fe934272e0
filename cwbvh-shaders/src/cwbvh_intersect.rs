use cwbvh_gpu::prelude::*;

#[spirv(compute(threads(64)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &CwbvhIntersectPassParams,
    #[spirv(descriptor_set = 0, binding = 0, storage_buffer)] nodes: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)]
    triangles: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)] rays: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)]
    hits: &mut [Vec4],
) {
    let ray_idx = global_id.x as usize;

    if ray_idx >= params.ray_count as usize {
        return;
    }

    let ray_d0 = unsafe { *rays.index_unchecked(2 * ray_idx) };
    let ray_d1 = unsafe { *rays.index_unchecked(2 * ray_idx + 1) };
    let ray = Ray::new(ray_d0.xyz(), ray_d1.xyz());

    let hit = ray.trace_cwbvh(
        CwbvhView::new(nodes),
        TrianglesView::new(triangles),
    );

    unsafe {
        *hits.index_unchecked_mut(ray_idx) = hit.pack();
    }
}
