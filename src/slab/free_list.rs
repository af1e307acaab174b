//! Intrusive free list threaded through unused slots.
//!
//! A free slot's first bytes hold a [`FreeNode`] pointing at the next free
//! slot. A slot is either on this list or handed out as an object, never both.

use core::mem;
use core::ptr::NonNull;

use super::block::Block;

/// Link written into a slot while it is free.
#[repr(C)]
pub(crate) struct FreeNode {
    next: Option<NonNull<FreeNode>>,
}

impl FreeNode {
    pub const SIZE: usize = mem::size_of::<FreeNode>();
    pub const ALIGN: usize = mem::align_of::<FreeNode>();
}

/// LIFO stack of free slots.
pub(crate) struct FreeList {
    head: Option<NonNull<FreeNode>>,
    len: usize,
}

impl FreeList {
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[cfg(test)]
    pub fn head(&self) -> Option<NonNull<u8>> {
        self.head.map(NonNull::cast)
    }

    /// Push `slot` on top of the list.
    ///
    /// # Safety
    ///
    /// `slot` must be valid for writes of a [`FreeNode`], aligned for it, not
    /// already on the list and not in use as a live object.
    pub unsafe fn push(&mut self, slot: NonNull<u8>) {
        let node = slot.cast::<FreeNode>();
        unsafe { node.as_ptr().write(FreeNode { next: self.head }) };
        self.head = Some(node);
        self.len += 1;
    }

    /// Pop the most recently pushed slot.
    pub fn pop(&mut self) -> Option<NonNull<u8>> {
        let node = self.head?;
        // SAFETY: every node on the list was written by `push` into a slot
        // that stays valid until the list is cleared.
        self.head = unsafe { (*node.as_ptr()).next };
        self.len -= 1;
        Some(node.cast())
    }

    /// Link every slot of a freshly created block in front of the current
    /// head. Afterwards the head is the block's first slot, the slots follow
    /// in address order, and the last one links to the previous head.
    ///
    /// # Safety
    ///
    /// No slot of `block` may be in use or already on the list.
    pub unsafe fn thread_block(&mut self, block: &Block) {
        for index in (0..block.capacity()).rev() {
            unsafe { self.push(block.slot_ptr(index)) };
        }
    }

    /// Forget every node. The slots themselves are left untouched.
    pub fn clear(&mut self) {
        self.head = None;
        self.len = 0;
    }
}
