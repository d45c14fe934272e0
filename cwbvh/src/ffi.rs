//! C ABI over a process-wide [`BvhRegistry`].
//!
//! Handles are non-negative `i32`s; every function treats negative, unknown
//! and destroyed handles as "not found" instead of failing.

use std::slice;

use glam::{Vec3, Vec4};

use crate::{BvhHandle, BvhRegistry};

static REGISTRY: BvhRegistry = BvhRegistry::new();

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FfiVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<FfiVec3> for Vec3 {
    fn from(value: FfiVec3) -> Self {
        Vec3::new(value.x, value.y, value.z)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FfiHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
    pub prim: u32,
}

/// Builds a BVH out of `triangle_count * 3` vertices and returns its handle,
/// or `-1` if the input is invalid.
///
/// # Safety
///
/// `vertices` must point at (at least) `triangle_count * 3` readable vertices;
/// they're copied before this function returns.
#[no_mangle]
pub unsafe extern "C" fn cwbvh_build(
    vertices: *const [f32; 4],
    triangle_count: i32,
    build_cwbvh: bool,
) -> i32 {
    if vertices.is_null() || triangle_count <= 0 {
        log::warn!(
            "Refusing to build BVH; vertices = {vertices:?}, triangles = \
             {triangle_count}"
        );

        return -1;
    }

    let triangle_count = triangle_count as usize;

    let vertices: Vec<_> =
        slice::from_raw_parts(vertices, triangle_count * 3)
            .iter()
            .copied()
            .map(Vec4::from_array)
            .collect();

    match REGISTRY.build(&vertices, triangle_count, build_cwbvh) {
        Ok(handle) => handle.into_raw(),

        Err(err) => {
            log::warn!("Couldn't build BVH: {err}");
            -1
        }
    }
}

#[no_mangle]
pub extern "C" fn cwbvh_destroy(handle: i32) {
    if let Some(handle) = BvhHandle::from_raw(handle) {
        REGISTRY.destroy(handle);
    }
}

#[no_mangle]
pub extern "C" fn cwbvh_is_ready(handle: i32) -> bool {
    BvhHandle::from_raw(handle).is_some_and(|handle| REGISTRY.is_ready(handle))
}

#[no_mangle]
pub extern "C" fn cwbvh_intersect(
    handle: i32,
    origin: FfiVec3,
    direction: FfiVec3,
    use_cwbvh: bool,
) -> FfiHit {
    let hit = match BvhHandle::from_raw(handle) {
        Some(handle) => REGISTRY.intersect(
            handle,
            origin.into(),
            direction.into(),
            use_cwbvh,
        ),
        None => Default::default(),
    };

    FfiHit {
        t: hit.t,
        u: hit.u,
        v: hit.v,
        prim: hit.prim,
    }
}

#[no_mangle]
pub extern "C" fn cwbvh_nodes_size_bytes(handle: i32) -> i32 {
    BvhHandle::from_raw(handle)
        .map_or(0, |handle| REGISTRY.nodes_size_bytes(handle) as i32)
}

#[no_mangle]
pub extern "C" fn cwbvh_tris_size_bytes(handle: i32) -> i32 {
    BvhHandle::from_raw(handle)
        .map_or(0, |handle| REGISTRY.tris_size_bytes(handle) as i32)
}

/// Writes pointers to the CWBVH node and triangle arrays; returns `false`
/// (leaving the outputs untouched) if the handle is unknown or its BVH was
/// built without the CWBVH.
///
/// The pointers stay valid until [`cwbvh_destroy()`] is called for this
/// handle.
///
/// # Safety
///
/// `nodes` and `triangles` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn cwbvh_data(
    handle: i32,
    nodes: *mut *const [f32; 4],
    triangles: *mut *const [f32; 4],
) -> bool {
    if nodes.is_null() || triangles.is_null() {
        return false;
    }

    let Some(cwbvh) =
        BvhHandle::from_raw(handle).and_then(|handle| REGISTRY.cwbvh(handle))
    else {
        return false;
    };

    *nodes = cwbvh.nodes().as_ptr().cast();
    *triangles = cwbvh.triangles().as_ptr().cast();

    true
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use approx::assert_relative_eq;

    use super::*;
    use crate::gpu::BVH_FAR;
    use crate::test_utils;

    fn vertices() -> Vec<[f32; 4]> {
        test_utils::two_triangles()
            .into_iter()
            .map(|vertex| vertex.to_array())
            .collect()
    }

    fn ray() -> (FfiVec3, FfiVec3) {
        (
            FfiVec3 {
                x: 2.0,
                y: 0.0,
                z: 4.0,
            },
            FfiVec3 {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
        )
    }

    #[test]
    fn lifecycle() {
        let vertices = vertices();
        let handle = unsafe { cwbvh_build(vertices.as_ptr(), 2, true) };

        assert!(handle >= 0);
        assert!(cwbvh_is_ready(handle));
        assert_eq!(2 * 48, cwbvh_tris_size_bytes(handle));
        assert_eq!(0, cwbvh_nodes_size_bytes(handle) % 80);

        let (origin, direction) = ray();

        for use_cwbvh in [false, true] {
            let hit = cwbvh_intersect(handle, origin, direction, use_cwbvh);

            assert_relative_eq!(4.0, hit.t, epsilon = 1e-4);
            assert_eq!(1, hit.prim);
        }

        let mut nodes = ptr::null();
        let mut triangles = ptr::null();

        assert!(unsafe { cwbvh_data(handle, &mut nodes, &mut triangles) });

        let triangles = unsafe { slice::from_raw_parts(triangles, 6) };
        let mut prims = [triangles[0][3].to_bits(), triangles[3][3].to_bits()];

        prims.sort();

        assert_eq!([0, 1], prims);
        assert!(!nodes.is_null());

        cwbvh_destroy(handle);

        assert!(!cwbvh_is_ready(handle));
        assert_eq!(0, cwbvh_nodes_size_bytes(handle));
        assert_eq!(BVH_FAR, cwbvh_intersect(handle, origin, direction, true).t);
    }

    #[test]
    fn invalid_input() {
        let vertices = vertices();

        assert_eq!(-1, unsafe { cwbvh_build(ptr::null(), 2, true) });
        assert_eq!(-1, unsafe { cwbvh_build(vertices.as_ptr(), 0, true) });
        assert_eq!(-1, unsafe { cwbvh_build(vertices.as_ptr(), -3, true) });
    }

    #[test]
    fn invalid_handles() {
        let (origin, direction) = ray();

        assert!(!cwbvh_is_ready(-1));
        assert!(!cwbvh_is_ready(i32::MAX));
        assert_eq!(0, cwbvh_tris_size_bytes(-5));
        assert_eq!(u32::MAX, cwbvh_intersect(-1, origin, direction, true).prim);

        cwbvh_destroy(-1);
        cwbvh_destroy(i32::MAX);

        let mut nodes = ptr::null();
        let mut triangles = ptr::null();

        assert!(!unsafe { cwbvh_data(-1, &mut nodes, &mut triangles) });
        assert!(nodes.is_null());
        assert!(triangles.is_null());
    }

    #[test]
    fn cpu_only_has_no_data() {
        let vertices = vertices();
        let handle = unsafe { cwbvh_build(vertices.as_ptr(), 2, false) };

        let mut nodes = ptr::null();
        let mut triangles = ptr::null();

        assert!(cwbvh_is_ready(handle));
        assert!(!unsafe { cwbvh_data(handle, &mut nodes, &mut triangles) });
        assert_eq!(0, cwbvh_tris_size_bytes(handle));

        cwbvh_destroy(handle);
    }
}
