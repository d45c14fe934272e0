//! Ray-triangle acceleration structures: a binary BVH for CPU queries and its
//! compressed 8-wide counterpart (CWBVH) meant for GPU traversal.
//!
//! BVHs live in a [`BvhRegistry`] and are referenced through handles; the
//! [`ConstructionPipeline`] builds them on a background thread out of vertices
//! read back from the GPU.

#![allow(clippy::len_without_is_empty)]

mod buffers;
mod bvh;
mod config;
mod cwbvh;
mod error;
mod export;
pub mod ffi;
mod gpu_bvh;
mod pipeline;
mod registry;
mod utils;

#[cfg(test)]
mod test_utils;

pub use cwbvh_gpu as gpu;

pub use self::buffers::*;
pub use self::bvh::Bvh;
pub use self::config::*;
pub use self::cwbvh::{Cwbvh, CwbvhNode, CwbvhStats};
pub use self::error::*;
pub use self::export::*;
pub use self::gpu_bvh::*;
pub use self::pipeline::*;
pub use self::registry::*;
pub use self::utils::{Axis, BoundingBox};
