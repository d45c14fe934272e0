use std::ops::Range;

use glam::{Vec3, Vec4, Vec4Swizzles};

use crate::gpu::Triangle;
use crate::utils::BoundingBox;

#[derive(Clone, Copy, Debug)]
pub struct BvhPrimitive {
    pub triangle: Triangle,
    pub center: Vec3,
    pub bounds: BoundingBox,
}

impl BvhPrimitive {
    pub fn new(prim: u32, [v0, v1, v2]: [Vec4; 3]) -> Self {
        let triangle = Triangle {
            v0: v0.xyz(),
            v1: v1.xyz(),
            v2: v2.xyz(),
            prim,
        };

        Self {
            triangle,
            center: triangle.center(),
            bounds: triangle.positions().into_iter().collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BvhPrimitiveId(u32);

impl BvhPrimitiveId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BvhPrimitivesRef {
    start: BvhPrimitiveId,
    end: BvhPrimitiveId,
}

impl BvhPrimitivesRef {
    pub fn new(start: BvhPrimitiveId, end: BvhPrimitiveId) -> Self {
        Self { start, end }
    }

    pub fn as_range(&self) -> Range<usize> {
        let start = self.start.get() as usize;
        let end = self.end.get() as usize;

        start..end
    }

    pub fn len(&self) -> usize {
        (self.end.get() - self.start.get()) as usize
    }

    /// Splits this range into `[start, start + at)` and `[start + at, end)`.
    pub fn split_at(&self, at: usize) -> (Self, Self) {
        let pivot = BvhPrimitiveId::new(self.start.get() + at as u32);

        (Self::new(self.start, pivot), Self::new(pivot, self.end))
    }
}

impl Default for BvhPrimitivesRef {
    fn default() -> Self {
        Self::new(BvhPrimitiveId::new(0), BvhPrimitiveId::new(0))
    }
}

/// Triangles of a BVH, ordered so that each leaf references a contiguous
/// range of them.
#[derive(Clone, Debug, Default)]
pub struct BvhPrimitives {
    items: Vec<BvhPrimitive>,
}

impl BvhPrimitives {
    pub fn new(items: Vec<BvhPrimitive>) -> Self {
        Self { items }
    }

    pub fn all_ref(&self) -> BvhPrimitivesRef {
        BvhPrimitivesRef::new(
            BvhPrimitiveId::new(0),
            BvhPrimitiveId::new(self.items.len() as u32),
        )
    }

    pub fn get(&self, primitives_ref: BvhPrimitivesRef) -> &[BvhPrimitive] {
        &self.items[primitives_ref.as_range()]
    }

    pub fn get_mut(
        &mut self,
        primitives_ref: BvhPrimitivesRef,
    ) -> &mut [BvhPrimitive] {
        &mut self.items[primitives_ref.as_range()]
    }

    pub fn bounds(&self, primitives_ref: BvhPrimitivesRef) -> BoundingBox {
        self.get(primitives_ref)
            .iter()
            .map(|primitive| primitive.bounds)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
