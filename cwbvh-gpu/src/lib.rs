//! Common structs and algorithms used by the CWBVH traversal shader and the
//! host-side builder.

#![cfg_attr(target_arch = "spirv", no_std)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]

mod cwbvh_view;
mod hit;
mod passes;
mod ray;
mod traversal_stack;
mod triangle;
mod triangles_view;
mod utils;

pub use self::cwbvh_view::*;
pub use self::hit::*;
pub use self::passes::*;
pub use self::ray::*;
pub use self::traversal_stack::*;
pub use self::triangle::*;
pub use self::triangles_view::*;
pub use self::utils::*;

pub mod prelude {
    pub use spirv_std::arch::IndexUnchecked;
    pub use spirv_std::glam::*;
    #[cfg(target_arch = "spirv")]
    pub use spirv_std::num_traits::Float;
    pub use spirv_std::spirv;

    pub use crate::*;
}

/// Distance reported by rays that didn't hit anything.
pub const BVH_FAR: f32 = 1e30;

/// Maximum number of node-groups postponed on the stack when traversing the
/// CWBVH.
///
/// Wide BVHs are shallow, so this is enough for any tree that fits into the
/// traversal format.
pub const BVH_STACK_SIZE: usize = 32;

/// Determinant threshold below which a triangle is considered to be parallel to
/// the ray (or degenerate) and gets skipped.
pub const TRIANGLE_EPSILON: f32 = 1e-7;

/// Number of `Vec4` blocks a single CWBVH node occupies.
pub const CWBVH_NODE_BLOCKS: usize = 5;

/// Number of `Vec4` blocks a single CWBVH triangle occupies.
pub const CWBVH_TRIANGLE_BLOCKS: usize = 3;

/// Maximum number of children of a CWBVH node.
pub const CWBVH_BRANCHING: usize = 8;

/// Maximum number of triangles a single CWBVH leaf can reference.
pub const CWBVH_MAX_LEAF_TRIANGLES: usize = 3;

/// Maximum number of triangles a single CWBVH node can reference (that's the
/// width of the triangle part of the hit-mask).
pub const CWBVH_MAX_NODE_TRIANGLES: usize = 24;
