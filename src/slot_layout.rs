//! Slot geometry shared by every block of a pool.
//!
//! A slot is the storage unit for one object. It is sized and aligned to at
//! least one cache line, and large enough to hold the free-list link that
//! occupies it while the slot is unused.

use core::alloc::Layout;
use core::mem;

use crate::slab::free_list::FreeNode;
use crate::{align_up, AllocError, AllocResult, CACHE_LINE_SIZE};

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Size and alignment of the slots carved out of each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    slot_size: usize,
    slot_align: usize,
    chunk_size: usize,
}

impl SlotLayout {
    /// Compute the slot layout for objects of `obj_size` bytes aligned to
    /// `obj_align`, carved out of chunks of `chunk_size` bytes.
    ///
    /// Fails with [`AllocError::InvalidParam`] when the object is larger than
    /// a cache line, the alignment is not a power of two, or the chunk size is
    /// not a non-zero multiple of the slot alignment holding at least one slot.
    pub const fn new(obj_size: usize, obj_align: usize, chunk_size: usize) -> AllocResult<Self> {
        if obj_size > CACHE_LINE_SIZE || !obj_align.is_power_of_two() {
            return Err(AllocError::InvalidParam);
        }
        if chunk_size == 0 || chunk_size % CACHE_LINE_SIZE != 0 || obj_align > chunk_size {
            return Err(AllocError::InvalidParam);
        }

        let slot_align = align_up(max(obj_align, FreeNode::ALIGN), CACHE_LINE_SIZE);
        let slot_size = align_up(max(obj_size, FreeNode::SIZE), slot_align);

        if chunk_size % slot_align != 0 || chunk_size < slot_size {
            return Err(AllocError::InvalidParam);
        }

        Ok(Self {
            slot_size,
            slot_align,
            chunk_size,
        })
    }

    /// Slot layout for objects of type `T`.
    pub const fn of<T>(chunk_size: usize) -> AllocResult<Self> {
        Self::new(mem::size_of::<T>(), mem::align_of::<T>(), chunk_size)
    }

    /// Bytes between the starts of two adjacent slots.
    pub const fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Alignment of every slot, and of every chunk.
    pub const fn slot_align(&self) -> usize {
        self.slot_align
    }

    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of slots in one chunk.
    pub const fn capacity(&self) -> usize {
        self.chunk_size / self.slot_size
    }

    /// Layout requested from the chunk provider for one block.
    pub fn chunk_layout(&self) -> AllocResult<Layout> {
        Layout::from_size_align(self.chunk_size, self.slot_align)
            .map_err(|_| AllocError::InvalidParam)
    }
}
