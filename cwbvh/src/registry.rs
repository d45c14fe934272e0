use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::{Vec3, Vec4};

use crate::gpu::{Hit, Ray};
use crate::{Bvh, BvhConfig, CwbvhExport, Result};

/// Identifies a BVH living in a [`BvhRegistry`].
///
/// Handles are plain slot indices: once a handle gets destroyed, its slot can
/// be handed out again by a later build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BvhHandle(u32);

impl BvhHandle {
    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    /// Converts a handle coming through the C ABI; negative values never
    /// resolve to anything.
    pub fn from_raw(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    pub fn into_raw(self) -> i32 {
        self.0 as i32
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

/// Thread-safe table of built BVHs.
///
/// The lock guards only the slot bookkeeping - building and intersecting
/// happen outside of it, on instances shared through [`Arc`].
#[derive(Debug)]
pub struct BvhRegistry {
    config: BvhConfig,
    slots: Mutex<Vec<Option<Arc<Bvh>>>>,
}

impl BvhRegistry {
    pub const fn new() -> Self {
        Self::with_config(BvhConfig::new())
    }

    pub const fn with_config(config: BvhConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> BvhConfig {
        self.config
    }

    /// Builds a BVH on the calling thread and registers it.
    ///
    /// Fails without allocating a handle when the input is empty or there are
    /// not enough vertices for given number of triangles.
    pub fn build(
        &self,
        vertices: &[Vec4],
        triangle_count: usize,
        build_cwbvh: bool,
    ) -> Result<BvhHandle> {
        let bvh =
            Bvh::build(vertices, triangle_count, build_cwbvh, self.config)?;

        Ok(self.add(bvh))
    }

    /// Registers given BVH, reusing the lowest free slot.
    pub fn add(&self, bvh: Bvh) -> BvhHandle {
        let bvh = Some(Arc::new(bvh));
        let mut slots = self.slots();

        let idx = if let Some(idx) = slots.iter().position(Option::is_none) {
            slots[idx] = bvh;
            idx
        } else {
            slots.push(bvh);
            slots.len() - 1
        };

        log::debug!("BVH registered; handle = {idx}");

        BvhHandle::new(idx as u32)
    }

    pub fn get(&self, handle: BvhHandle) -> Option<Arc<Bvh>> {
        self.slots().get(handle.get() as usize)?.clone()
    }

    /// Releases given BVH; returns whether the handle was alive.
    ///
    /// Views returned by [`Self::cwbvh()`] keep their data alive on their own,
    /// so dropping the registry's reference here is always sound.
    pub fn destroy(&self, handle: BvhHandle) -> bool {
        let bvh = self
            .slots()
            .get_mut(handle.get() as usize)
            .and_then(Option::take);

        if bvh.is_some() {
            log::debug!("BVH destroyed; handle = {}", handle.get());
        }

        bvh.is_some()
    }

    pub fn is_ready(&self, handle: BvhHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Returns the closest hit, or [`Hit::none()`] if the handle is dead.
    pub fn intersect(
        &self,
        handle: BvhHandle,
        origin: Vec3,
        direction: Vec3,
        use_cwbvh: bool,
    ) -> Hit {
        self.get(handle).map_or_else(Hit::none, |bvh| {
            bvh.intersect(Ray::new(origin, direction), use_cwbvh)
        })
    }

    /// Returns size of the CWBVH node array, or zero if it's not available.
    pub fn nodes_size_bytes(&self, handle: BvhHandle) -> usize {
        self.cwbvh(handle)
            .map_or(0, |cwbvh| cwbvh.nodes_size_bytes())
    }

    /// Returns size of the CWBVH triangle array, or zero if it's not
    /// available.
    pub fn tris_size_bytes(&self, handle: BvhHandle) -> usize {
        self.cwbvh(handle)
            .map_or(0, |cwbvh| cwbvh.tris_size_bytes())
    }

    /// Returns a view into the CWBVH arrays, or `None` if the handle is dead or
    /// the BVH was built without them.
    pub fn cwbvh(&self, handle: BvhHandle) -> Option<CwbvhExport> {
        CwbvhExport::new(self.get(handle)?)
    }

    /// Returns the number of live BVHs.
    pub fn len(&self) -> usize {
        self.slots().iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Option<Arc<Bvh>>>> {
        // Every critical section leaves the table consistent, so a panic while
        // holding the lock doesn't invalidate it
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BvhRegistry {
    fn default() -> Self {
        Self::new()
    }
}
