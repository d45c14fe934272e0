use glam::UVec2;

use crate::BVH_STACK_SIZE;

/// Stack of node-groups yet-to-be-visited when traversing the CWBVH.
///
/// Each traversal step pushes at most one group, so the stack never grows
/// deeper than the tree itself; trees deeper than [`BVH_STACK_SIZE`] are
/// rejected when built.
pub struct TraversalStack {
    items: [UVec2; BVH_STACK_SIZE],
    len: usize,
}

impl TraversalStack {
    pub fn new() -> Self {
        Self {
            items: [UVec2::ZERO; BVH_STACK_SIZE],
            len: 0,
        }
    }

    pub fn push(&mut self, item: UVec2) {
        if self.len < BVH_STACK_SIZE {
            self.items[self.len] = item;
            self.len += 1;
        }
    }

    pub fn pop(&mut self) -> Option<UVec2> {
        if self.len > 0 {
            self.len -= 1;
            Some(self.items[self.len])
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for TraversalStack {
    fn default() -> Self {
        Self::new()
    }
}
