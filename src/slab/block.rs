//! Block implementation.
//!
//! A [`Block`] owns one chunk obtained from a [`ChunkProvider`] and keeps a
//! bitmap of which of its slots are handed out.

use alloc::vec::Vec;
use core::alloc::Layout;
use core::ptr::NonNull;

#[cfg(feature = "log")]
use log::error;

use crate::slot_layout::SlotLayout;
use crate::{is_aligned, AllocError, AllocResult, ChunkProvider};

const BITS_PER_WORD: usize = u64::BITS as usize;

pub(crate) struct Block {
    base: NonNull<u8>,
    chunk: Layout,
    slot_size: usize,
    capacity: usize,
    used: usize,
    occupied: Vec<u64>,
}

impl Block {
    /// Obtain a chunk from `provider` and wrap it as a block with no slot in
    /// use. The block's slots are not linked into any free list yet.
    ///
    /// The occupancy bitmap is allocated first, so a [`AllocError::NoMemory`]
    /// from it leaves the provider untouched.
    pub fn create<P: ChunkProvider + ?Sized>(
        layout: &SlotLayout,
        provider: &mut P,
    ) -> AllocResult<Self> {
        let chunk = layout.chunk_layout()?;
        let capacity = layout.capacity();
        let words = (capacity + BITS_PER_WORD - 1) / BITS_PER_WORD;
        let mut occupied = Vec::new();
        occupied
            .try_reserve_exact(words)
            .map_err(|_| AllocError::NoMemory)?;
        occupied.resize(words, 0u64);

        let base = provider.alloc_chunk(chunk)?;

        if !is_aligned(base.as_ptr() as usize, chunk.align()) {
            error!(
                "chunk provider returned {:p}, not aligned to {}",
                base.as_ptr(),
                chunk.align()
            );
            // SAFETY: the chunk was just obtained from this provider.
            unsafe { provider.dealloc_chunk(base, chunk) };
            return Err(AllocError::InvalidParam);
        }

        Ok(Self {
            base,
            chunk,
            slot_size: layout.slot_size(),
            capacity,
            used: 0,
            occupied,
        })
    }

    /// Return the chunk to the provider it came from.
    ///
    /// # Safety
    ///
    /// `provider` must be the one passed to [`Block::create`], and no slot of
    /// this block may be reachable from a free list afterwards.
    pub unsafe fn release<P: ChunkProvider + ?Sized>(self, provider: &mut P) {
        unsafe { provider.dealloc_chunk(self.base, self.chunk) };
    }

    pub fn base_addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base_addr() && addr - self.base_addr() < self.chunk.size()
    }

    /// Index of the slot starting at `addr`, or `None` if `addr` is outside
    /// the block or not on a slot boundary.
    pub fn slot_index(&self, addr: usize) -> Option<usize> {
        if !self.contains(addr) {
            return None;
        }
        let offset = addr - self.base_addr();
        if offset % self.slot_size != 0 {
            return None;
        }
        let index = offset / self.slot_size;
        (index < self.capacity).then_some(index)
    }

    pub fn slot_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.capacity);
        // SAFETY: index < capacity keeps the offset inside the chunk.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(index * self.slot_size)) }
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.occupied[index / BITS_PER_WORD] & (1u64 << (index % BITS_PER_WORD)) != 0
    }

    /// Mark a slot as handed out. Returns false if it already was.
    pub fn mark_used(&mut self, index: usize) -> bool {
        let mask = 1u64 << (index % BITS_PER_WORD);
        let word = &mut self.occupied[index / BITS_PER_WORD];
        if *word & mask != 0 {
            return false;
        }
        *word |= mask;
        self.used += 1;
        true
    }

    /// Mark a slot as free. Returns false if it already was (double free).
    pub fn mark_free(&mut self, index: usize) -> bool {
        let mask = 1u64 << (index % BITS_PER_WORD);
        let word = &mut self.occupied[index / BITS_PER_WORD];
        if *word & mask == 0 {
            return false;
        }
        *word &= !mask;
        self.used -= 1;
        true
    }
}
