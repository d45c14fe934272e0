use glam::Vec4;
use spirv_std::arch::IndexUnchecked;

use crate::{Triangle, CWBVH_TRIANGLE_BLOCKS};

/// Read-only view into the CWBVH triangle buffer.
#[derive(Clone, Copy)]
pub struct TrianglesView<'a> {
    buffer: &'a [Vec4],
}

impl<'a> TrianglesView<'a> {
    pub fn new(buffer: &'a [Vec4]) -> Self {
        Self { buffer }
    }

    pub fn get(self, triangle_idx: u32) -> Triangle {
        let ptr = (triangle_idx as usize) * CWBVH_TRIANGLE_BLOCKS;

        unsafe {
            Triangle::deserialize([
                *self.buffer.index_unchecked(ptr),
                *self.buffer.index_unchecked(ptr + 1),
                *self.buffer.index_unchecked(ptr + 2),
            ])
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len() / CWBVH_TRIANGLE_BLOCKS
    }
}
