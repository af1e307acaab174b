//! Spin-locked slab pool for shared use.
//!
//! One lock guards both the block list and the free-list head, so every
//! operation of the inner [`SlabPool`] runs to completion without
//! interleaving.

use core::ptr::NonNull;

use kspin::{SpinNoIrq, SpinNoIrqGuard};

#[cfg(feature = "tracking")]
use crate::slab::PoolStats;
use crate::slab::SlabPool;
use crate::{AllocResult, ChunkProvider, SystemChunkProvider, DEFAULT_CHUNK_SIZE};

/// [`SlabPool`] behind a [`SpinNoIrq`] lock, usable through `&self`.
pub struct LockedSlabPool<
    T,
    const CHUNK_SIZE: usize = { DEFAULT_CHUNK_SIZE },
    P: ChunkProvider = SystemChunkProvider,
> {
    inner: SpinNoIrq<SlabPool<T, CHUNK_SIZE, P>>,
}

impl<T, const CHUNK_SIZE: usize> LockedSlabPool<T, CHUNK_SIZE> {
    pub const fn new() -> Self {
        Self::with_provider(SystemChunkProvider)
    }
}

impl<T, const CHUNK_SIZE: usize> Default for LockedSlabPool<T, CHUNK_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const CHUNK_SIZE: usize, P: ChunkProvider> LockedSlabPool<T, CHUNK_SIZE, P> {
    pub const fn with_provider(provider: P) -> Self {
        Self {
            inner: SpinNoIrq::new(SlabPool::with_provider(provider)),
        }
    }

    /// Lock the pool for a sequence of operations.
    pub fn lock(&self) -> SpinNoIrqGuard<'_, SlabPool<T, CHUNK_SIZE, P>> {
        self.inner.lock()
    }

    pub fn allocate(&self) -> AllocResult<NonNull<T>> {
        self.inner.lock().allocate()
    }

    pub fn allocate_with(&self, value: T) -> AllocResult<NonNull<T>> {
        self.inner.lock().allocate_with(value)
    }

    pub fn deallocate(&self, ptr: NonNull<T>) -> AllocResult {
        self.inner.lock().deallocate(ptr)
    }

    /// Drop the object at `ptr` in place, then return its slot to the pool.
    ///
    /// The lock is not held while `T::drop` runs, so the drop may itself
    /// allocate from or destroy into this pool.
    ///
    /// # Safety
    ///
    /// Same contract as [`SlabPool::destroy`]. In addition, no other thread
    /// may deallocate `ptr` while this call is in progress.
    pub unsafe fn destroy(&self, ptr: NonNull<T>) -> AllocResult {
        self.inner.lock().check_allocated(ptr)?;
        unsafe { ptr.as_ptr().drop_in_place() };
        self.deallocate(ptr)
    }

    /// Release every block. Requires exclusive access, so no allocation or
    /// deallocation can be in flight.
    pub fn release_all_blocks(&mut self) {
        self.inner.get_mut().release_all_blocks();
    }

    pub fn block_count(&self) -> usize {
        self.inner.lock().block_count()
    }

    pub fn used(&self) -> usize {
        self.inner.lock().used()
    }

    pub fn available(&self) -> usize {
        self.inner.lock().available()
    }

    /// Get pool statistics
    #[cfg(feature = "tracking")]
    pub fn stats(&self) -> PoolStats {
        self.inner.lock().stats()
    }

    pub fn into_inner(self) -> SlabPool<T, CHUNK_SIZE, P> {
        self.inner.into_inner()
    }
}
