#![cfg_attr(target_arch = "spirv", no_std)]

pub mod cwbvh_intersect;
