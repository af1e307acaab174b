//! Slab pool for a single object type.
//!
//! [`SlabPool`] owns an append-only list of blocks and one free list threaded
//! through every unused slot. Allocation pops the free list and grows by
//! exactly one block when it is empty; deallocation validates the pointer and
//! pushes the slot back.

use alloc::vec::Vec;
use core::marker::PhantomData;
use core::ptr::NonNull;

#[cfg(feature = "log")]
use log::{debug, error, trace, warn};

use super::block::Block;
use super::free_list::FreeList;
#[cfg(feature = "tracking")]
use super::stats::PoolStats;
use crate::slot_layout::SlotLayout;
use crate::{AllocError, AllocResult, ChunkProvider, SystemChunkProvider, DEFAULT_CHUNK_SIZE};

/// Pool of cache-line-aligned slots for objects of type `T`.
///
/// Every growth step requests one chunk of `CHUNK_SIZE` bytes from `P`.
/// The pool hands out uninitialized storage; constructing and dropping the
/// objects is up to the caller (see [`allocate_with`](Self::allocate_with) and
/// [`destroy`](Self::destroy) for the common case).
///
/// Instantiating the pool with a `T` larger than
/// [`CACHE_LINE_SIZE`](crate::CACHE_LINE_SIZE) or a `CHUNK_SIZE` that is not a
/// multiple of the slot alignment fails to compile:
///
/// ```compile_fail
/// use cacheline_slab_allocator::SlabPool;
///
/// let pool = SlabPool::<[u8; 65]>::new();
/// # drop(pool);
/// ```
///
/// ```compile_fail
/// use cacheline_slab_allocator::SlabPool;
///
/// let pool = SlabPool::<u64, 100>::new();
/// # drop(pool);
/// ```
///
/// Objects up to a cache line in size with a chunk of whole cache lines are
/// accepted:
///
/// ```
/// use cacheline_slab_allocator::SlabPool;
///
/// let mut pool = SlabPool::<[u8; 64], 128>::new();
/// assert_eq!(pool.layout().capacity(), 2);
/// let ptr = pool.allocate_with([7; 64]).unwrap();
/// pool.deallocate(ptr).unwrap();
/// ```
pub struct SlabPool<
    T,
    const CHUNK_SIZE: usize = { DEFAULT_CHUNK_SIZE },
    P: ChunkProvider = SystemChunkProvider,
> {
    blocks: Vec<Block>,
    /// `(base address, index in blocks)`, sorted by base address.
    by_addr: Vec<(usize, usize)>,
    free: FreeList,
    provider: P,
    #[cfg(feature = "tracking")]
    stats: PoolStats,
    _marker: PhantomData<*mut T>,
}

// SAFETY: the pool exclusively owns its blocks and the slots in them, so
// moving it to another thread moves that ownership along.
unsafe impl<T: Send, const CHUNK_SIZE: usize, P: ChunkProvider + Send> Send
    for SlabPool<T, CHUNK_SIZE, P>
{
}

impl<T, const CHUNK_SIZE: usize> SlabPool<T, CHUNK_SIZE> {
    /// Create an empty pool backed by the global allocator.
    pub const fn new() -> Self {
        Self::with_provider(SystemChunkProvider)
    }
}

impl<T, const CHUNK_SIZE: usize> Default for SlabPool<T, CHUNK_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const CHUNK_SIZE: usize, P: ChunkProvider> SlabPool<T, CHUNK_SIZE, P> {
    /// Slot layout of this pool type.
    pub const LAYOUT: SlotLayout = match SlotLayout::of::<T>(CHUNK_SIZE) {
        Ok(layout) => layout,
        Err(_) => panic!("object type exceeds a cache line or CHUNK_SIZE is not a multiple of the slot alignment"),
    };

    /// Create an empty pool that obtains its chunks from `provider`.
    ///
    /// No memory is requested until the first allocation.
    pub const fn with_provider(provider: P) -> Self {
        // Evaluated here so an invalid `T` or `CHUNK_SIZE` fails to compile.
        let _layout: SlotLayout = Self::LAYOUT;
        Self {
            blocks: Vec::new(),
            by_addr: Vec::new(),
            free: FreeList::new(),
            provider,
            #[cfg(feature = "tracking")]
            stats: PoolStats::new(),
            _marker: PhantomData,
        }
    }

    /// Allocate uninitialized storage for one `T`.
    ///
    /// Grows the pool by one block if no slot is free. Fails with
    /// [`AllocError::NoMemory`] if the provider cannot supply that block, in
    /// which case the pool is left exactly as it was.
    pub fn allocate(&mut self) -> AllocResult<NonNull<T>> {
        if self.free.is_empty() {
            self.grow()?;
        }
        let slot = self.free.pop().ok_or(AllocError::NoMemory)?;

        let addr = slot.as_ptr() as usize;
        let Some((block_idx, slot_idx)) = self.locate(addr) else {
            panic!("free list holds {:#x}, which lies in no block", addr);
        };
        if !self.blocks[block_idx].mark_used(slot_idx) {
            panic!("slot {:#x} was on the free list while in use", addr);
        }

        #[cfg(feature = "tracking")]
        {
            let used = self.used();
            self.stats.record_alloc(used);
        }

        Ok(slot.cast())
    }

    /// Allocate a slot and move `value` into it.
    pub fn allocate_with(&mut self, value: T) -> AllocResult<NonNull<T>> {
        let ptr = self.allocate()?;
        // SAFETY: the slot is sized and aligned for `T` and not in use.
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    /// Return the slot at `ptr` to the pool.
    ///
    /// The object in the slot, if any, is not dropped. Fails with
    /// [`AllocError::NotOwned`] if `ptr` is not a slot of this pool and with
    /// [`AllocError::NotAllocated`] if the slot is already free; the pool is
    /// unchanged in both cases.
    pub fn deallocate(&mut self, ptr: NonNull<T>) -> AllocResult {
        let (block_idx, slot_idx) = self.find_allocated(ptr.as_ptr() as usize)?;
        self.blocks[block_idx].mark_free(slot_idx);
        // SAFETY: the slot lies in one of our blocks and was in use until now,
        // so it is not on the free list.
        unsafe { self.free.push(ptr.cast()) };
        Ok(())
    }

    /// Drop the object at `ptr` in place, then return its slot to the pool.
    ///
    /// The pointer is validated before anything is dropped.
    ///
    /// # Safety
    ///
    /// If `ptr` is an allocated slot of this pool, it must hold an initialized
    /// `T` that is not accessed afterwards.
    pub unsafe fn destroy(&mut self, ptr: NonNull<T>) -> AllocResult {
        self.check_allocated(ptr)?;
        unsafe { ptr.as_ptr().drop_in_place() };
        self.deallocate(ptr)
    }

    /// Fail the way [`deallocate`](Self::deallocate) would for `ptr`, without
    /// touching the slot.
    pub(crate) fn check_allocated(&mut self, ptr: NonNull<T>) -> AllocResult {
        self.find_allocated(ptr.as_ptr() as usize).map(|_| ())
    }

    /// Whether `ptr` addresses a slot of one of this pool's blocks.
    pub fn owns(&self, ptr: NonNull<T>) -> bool {
        self.locate(ptr.as_ptr() as usize).is_some()
    }

    /// Whether `ptr` addresses a slot of this pool that is currently handed out.
    pub fn is_allocated(&self, ptr: NonNull<T>) -> bool {
        self.locate(ptr.as_ptr() as usize)
            .is_some_and(|(block_idx, slot_idx)| self.blocks[block_idx].is_occupied(slot_idx))
    }

    /// Release every block back to the provider and empty the free list.
    ///
    /// Objects still living in the pool are not dropped; their storage is
    /// simply returned. Calling this on an empty pool does nothing.
    pub fn release_all_blocks(&mut self) {
        if self.blocks.is_empty() {
            return;
        }

        let busy = self.blocks.iter().filter(|block| !block.is_empty()).count();
        if busy != 0 {
            warn!(
                "slab pool: releasing {} blocks, {} of them with {} slots still in use",
                self.blocks.len(),
                busy,
                self.used()
            );
        }
        trace!("slab pool: releasing {} blocks", self.blocks.len());

        self.free.clear();
        self.by_addr.clear();
        for block in self.blocks.drain(..) {
            // SAFETY: every block came from `self.provider`, and the free list
            // was cleared above.
            unsafe { block.release(&mut self.provider) };
        }
    }

    pub fn layout(&self) -> SlotLayout {
        Self::LAYOUT
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total slots across all blocks.
    pub fn capacity(&self) -> usize {
        self.blocks.len() * Self::LAYOUT.capacity()
    }

    /// Slots currently handed out.
    pub fn used(&self) -> usize {
        self.capacity() - self.free.len()
    }

    /// Slots on the free list.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Slots handed out from the block created `index`-th.
    pub fn block_used(&self, index: usize) -> Option<usize> {
        self.blocks.get(index).map(Block::used)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get pool statistics
    #[cfg(feature = "tracking")]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            blocks: self.block_count(),
            capacity: self.capacity(),
            used: self.used(),
            free: self.available(),
            ..self.stats
        }
    }

    /// Create one block, append it and link its slots in front of the free
    /// list. Bookkeeping storage is reserved before the chunk is requested,
    /// and the free list is touched only once nothing can fail, so on error
    /// nothing is modified.
    fn grow(&mut self) -> AllocResult {
        if self.blocks.try_reserve(1).is_err() || self.by_addr.try_reserve(1).is_err() {
            return Err(self.growth_failed(AllocError::NoMemory));
        }
        let block = match Block::create(&Self::LAYOUT, &mut self.provider) {
            Ok(block) => block,
            Err(e) => return Err(self.growth_failed(e)),
        };

        let base = block.base_addr();
        let index = self.blocks.len();
        let pos = self.by_addr.partition_point(|&(addr, _)| addr < base);
        self.by_addr.insert(pos, (base, index));
        debug!(
            "slab pool: block {} at {:#x} with {} slots of {} bytes",
            index,
            base,
            block.capacity(),
            Self::LAYOUT.slot_size()
        );
        self.blocks.push(block);

        // SAFETY: the block is new, so none of its slots is in use or listed.
        unsafe { self.free.thread_block(&self.blocks[index]) };

        #[cfg(feature = "tracking")]
        {
            self.stats.growth_events += 1;
        }
        Ok(())
    }

    fn growth_failed(&mut self, err: AllocError) -> AllocError {
        error!(
            "slab pool: failed to grow beyond {} blocks: {}",
            self.blocks.len(),
            err
        );
        #[cfg(feature = "tracking")]
        {
            self.stats.failed_growths += 1;
        }
        err
    }

    /// Block and slot index of the slot starting at `addr`.
    fn locate(&self, addr: usize) -> Option<(usize, usize)> {
        let pos = self.by_addr.partition_point(|&(base, _)| base <= addr);
        let (_, block_idx) = *self.by_addr.get(pos.checked_sub(1)?)?;
        let slot_idx = self.blocks[block_idx].slot_index(addr)?;
        Some((block_idx, slot_idx))
    }

    fn find_allocated(&mut self, addr: usize) -> AllocResult<(usize, usize)> {
        let Some((block_idx, slot_idx)) = self.locate(addr) else {
            warn!("slab pool: {:#x} is not a slot of this pool", addr);
            return Err(self.reject(AllocError::NotOwned));
        };
        if !self.blocks[block_idx].is_occupied(slot_idx) {
            warn!("slab pool: double free of {:#x}", addr);
            return Err(self.reject(AllocError::NotAllocated));
        }
        Ok((block_idx, slot_idx))
    }

    fn reject(&mut self, err: AllocError) -> AllocError {
        #[cfg(feature = "tracking")]
        {
            self.stats.rejected_frees += 1;
        }
        err
    }
}

impl<T, const CHUNK_SIZE: usize, P: ChunkProvider> Drop for SlabPool<T, CHUNK_SIZE, P> {
    fn drop(&mut self) {
        self.release_all_blocks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::alloc::{alloc, dealloc};
    use alloc::rc::Rc;
    use alloc::vec;
    use core::alloc::Layout;
    use core::cell::Cell;

    #[derive(Default)]
    struct MockState {
        allocated: Cell<usize>,
        freed: Cell<usize>,
        fail: Cell<bool>,
    }

    struct MockChunkProvider {
        state: Rc<MockState>,
        live: Vec<(usize, Layout)>,
    }

    impl MockChunkProvider {
        fn new() -> (Self, Rc<MockState>) {
            let state = Rc::new(MockState::default());
            let provider = Self {
                state: state.clone(),
                live: Vec::new(),
            };
            (provider, state)
        }
    }

    impl ChunkProvider for MockChunkProvider {
        fn alloc_chunk(&mut self, layout: Layout) -> AllocResult<NonNull<u8>> {
            if self.state.fail.get() {
                return Err(AllocError::NoMemory);
            }
            let ptr = NonNull::new(unsafe { alloc(layout) }).ok_or(AllocError::NoMemory)?;
            self.live.push((ptr.as_ptr() as usize, layout));
            self.state.allocated.set(self.state.allocated.get() + 1);
            Ok(ptr)
        }

        unsafe fn dealloc_chunk(&mut self, ptr: NonNull<u8>, layout: Layout) {
            let idx = self
                .live
                .iter()
                .position(|&(addr, l)| addr == ptr.as_ptr() as usize && l == layout)
                .expect("chunk released twice or never allocated");
            self.live.swap_remove(idx);
            self.state.freed.set(self.state.freed.get() + 1);
            unsafe { dealloc(ptr.as_ptr(), layout) };
        }
    }

    type MockPool<T> = SlabPool<T, 4096, MockChunkProvider>;

    fn mock_pool<T>() -> (MockPool<T>, Rc<MockState>) {
        let (provider, state) = MockChunkProvider::new();
        (SlabPool::with_provider(provider), state)
    }

    #[test]
    fn test_new_pool_is_empty() {
        let (pool, state) = mock_pool::<u64>();
        assert_eq!(pool.block_count(), 0);
        assert_eq!(pool.capacity(), 0);
        assert_eq!(pool.used(), 0);
        assert!(pool.free.head().is_none());
        assert_eq!(state.allocated.get(), 0);
    }

    #[test]
    fn test_alloc_dealloc() {
        let (mut pool, _state) = mock_pool::<u64>();
        let ptr = pool.allocate().unwrap();
        assert_eq!(pool.used(), 1);
        assert_eq!(pool.block_used(0), Some(1));
        assert!(pool.is_allocated(ptr));

        pool.deallocate(ptr).unwrap();
        assert_eq!(pool.used(), 0);
        assert_eq!(pool.block_used(0), Some(0));
        assert!(pool.owns(ptr));
        assert!(!pool.is_allocated(ptr));
    }

    #[test]
    fn test_round_trip_without_overlap() {
        let (mut pool, _state) = mock_pool::<[u64; 8]>();
        let capacity = MockPool::<[u64; 8]>::LAYOUT.capacity();

        let mut ptrs = Vec::new();
        for i in 0..capacity {
            let ptr = pool.allocate().unwrap();
            unsafe { ptr.as_ptr().write([i as u64; 8]) };
            ptrs.push(ptr);
        }
        assert_eq!(pool.block_count(), 1);

        for (i, ptr) in ptrs.iter().enumerate() {
            assert_eq!(unsafe { *ptr.as_ptr() }, [i as u64; 8]);
        }

        let mut addrs: Vec<usize> = ptrs.iter().map(|p| p.as_ptr() as usize).collect();
        addrs.sort_unstable();
        for pair in addrs.windows(2) {
            assert!(pair[1] - pair[0] >= pool.layout().slot_size());
        }

        for ptr in ptrs {
            pool.deallocate(ptr).unwrap();
        }
    }

    #[test]
    fn test_lifo_reuse() {
        let (mut pool, _state) = mock_pool::<u32>();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        let c = pool.allocate().unwrap();

        pool.deallocate(a).unwrap();
        pool.deallocate(b).unwrap();
        pool.deallocate(c).unwrap();

        assert_eq!(pool.allocate().unwrap(), c);
        assert_eq!(pool.allocate().unwrap(), b);
        assert_eq!(pool.allocate().unwrap(), a);
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn test_growth_after_one_full_block() {
        let (mut pool, state) = mock_pool::<u64>();
        assert_eq!(pool.layout().slot_size(), 64);
        assert_eq!(pool.layout().capacity(), 64);

        for _ in 0..64 {
            pool.allocate().unwrap();
        }
        assert_eq!(pool.block_count(), 1);
        assert_eq!(state.allocated.get(), 1);
        assert!(pool.free.head().is_none());

        let ptr = pool.allocate().unwrap();
        assert_eq!(pool.block_count(), 2);
        assert_eq!(state.allocated.get(), 2);
        assert_eq!(pool.block_used(0), Some(64));
        assert_eq!(pool.block_used(1), Some(1));
        assert_eq!(pool.available(), 63);
        assert!(pool.owns(ptr));
    }

    #[test]
    fn test_freed_slot_reused_before_growth() {
        let (mut pool, _state) = mock_pool::<u64>();
        let first = pool.allocate().unwrap();
        for _ in 1..64 {
            pool.allocate().unwrap();
        }
        pool.deallocate(first).unwrap();

        assert_eq!(pool.allocate().unwrap(), first);
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn test_exhaustion_on_first_allocation() {
        let (mut pool, state) = mock_pool::<u64>();
        state.fail.set(true);

        assert_eq!(pool.allocate(), Err(AllocError::NoMemory));
        assert_eq!(pool.block_count(), 0);
        assert!(pool.free.head().is_none());
    }

    #[test]
    fn test_exhaustion_leaves_state_unchanged() {
        let (mut pool, state) = mock_pool::<u64>();
        let mut ptrs = Vec::new();
        for _ in 0..64 {
            ptrs.push(pool.allocate().unwrap());
        }

        state.fail.set(true);
        assert_eq!(pool.allocate(), Err(AllocError::NoMemory));
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.used(), 64);
        assert!(pool.free.head().is_none());

        // Freed slots remain usable while the provider is failing.
        let last = ptrs.pop().unwrap();
        pool.deallocate(last).unwrap();
        assert_eq!(pool.free.head(), Some(last.cast()));
        assert_eq!(pool.allocate().unwrap(), last);

        // Retry succeeds once the provider recovers.
        state.fail.set(false);
        pool.allocate().unwrap();
        assert_eq!(pool.block_count(), 2);
    }

    #[test]
    fn test_release_all_blocks_is_idempotent() {
        let (mut pool, state) = mock_pool::<u64>();
        let ptrs: Vec<_> = (0..100).map(|_| pool.allocate().unwrap()).collect();
        for ptr in ptrs {
            pool.deallocate(ptr).unwrap();
        }
        assert_eq!(pool.block_count(), 2);

        pool.release_all_blocks();
        assert_eq!(pool.block_count(), 0);
        assert!(pool.free.head().is_none());
        assert_eq!(pool.available(), 0);
        assert_eq!(state.freed.get(), 2);

        pool.release_all_blocks();
        assert_eq!(state.freed.get(), 2);

        drop(pool);
        assert_eq!(state.freed.get(), 2);
    }

    #[test]
    fn test_pool_usable_after_release() {
        let (mut pool, state) = mock_pool::<u64>();
        let ptr = pool.allocate().unwrap();
        pool.deallocate(ptr).unwrap();
        pool.release_all_blocks();

        assert!(!pool.owns(ptr));
        pool.allocate().unwrap();
        assert_eq!(pool.block_count(), 1);
        assert_eq!(state.allocated.get(), 2);
    }

    #[test]
    fn test_drop_releases_every_block() {
        let (mut pool, state) = mock_pool::<u64>();
        for _ in 0..200 {
            pool.allocate().unwrap();
        }
        assert_eq!(state.allocated.get(), 4);

        drop(pool);
        assert_eq!(state.freed.get(), 4);
    }

    #[test]
    fn test_deallocate_foreign_pointer() {
        let (mut pool, _state) = mock_pool::<u64>();
        let ptr = pool.allocate().unwrap();

        let mut outside = 0u64;
        assert_eq!(
            pool.deallocate(NonNull::from(&mut outside)),
            Err(AllocError::NotOwned)
        );

        let interior = unsafe { NonNull::new_unchecked(ptr.as_ptr().cast::<u8>().add(8)) };
        assert_eq!(
            pool.deallocate(interior.cast()),
            Err(AllocError::NotOwned)
        );

        assert_eq!(pool.used(), 1);
        assert_eq!(pool.available(), 63);
        pool.deallocate(ptr).unwrap();
    }

    #[test]
    fn test_double_free_is_reported() {
        let (mut pool, _state) = mock_pool::<u64>();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();

        pool.deallocate(a).unwrap();
        assert_eq!(pool.deallocate(a), Err(AllocError::NotAllocated));
        assert_eq!(pool.available(), 63);

        // The free list was not corrupted by the rejected call.
        assert_eq!(pool.allocate().unwrap(), a);
        assert_ne!(pool.allocate().unwrap(), a);
        pool.deallocate(b).unwrap();
    }

    #[test]
    fn test_never_allocated_slot_is_reported() {
        let (mut pool, _state) = mock_pool::<u64>();
        let a = pool.allocate().unwrap();
        let next_slot = unsafe { NonNull::new_unchecked(a.as_ptr().cast::<u8>().add(64)) };
        assert_eq!(
            pool.deallocate(next_slot.cast::<u64>()),
            Err(AllocError::NotAllocated)
        );
    }

    /// Hands out pre-allocated chunks from the highest address down.
    struct DescendingChunkProvider {
        chunks: Vec<NonNull<u8>>,
    }

    impl DescendingChunkProvider {
        fn new(count: usize) -> Self {
            let layout = Layout::from_size_align(4096, 64).unwrap();
            let mut chunks: Vec<_> = (0..count)
                .map(|_| NonNull::new(unsafe { alloc(layout) }).unwrap())
                .collect();
            chunks.sort_unstable();
            Self { chunks }
        }
    }

    impl ChunkProvider for DescendingChunkProvider {
        fn alloc_chunk(&mut self, _layout: Layout) -> AllocResult<NonNull<u8>> {
            self.chunks.pop().ok_or(AllocError::NoMemory)
        }

        unsafe fn dealloc_chunk(&mut self, ptr: NonNull<u8>, layout: Layout) {
            unsafe { dealloc(ptr.as_ptr(), layout) };
        }
    }

    impl Drop for DescendingChunkProvider {
        fn drop(&mut self) {
            let layout = Layout::from_size_align(4096, 64).unwrap();
            for ptr in self.chunks.drain(..) {
                unsafe { dealloc(ptr.as_ptr(), layout) };
            }
        }
    }

    #[test]
    fn test_lookup_with_blocks_in_descending_address_order() {
        let provider = DescendingChunkProvider::new(4);
        let mut pool = SlabPool::<u64, 4096, DescendingChunkProvider>::with_provider(provider);
        let ptrs: Vec<_> = (0..256).map(|_| pool.allocate().unwrap()).collect();
        assert_eq!(pool.block_count(), 4);
        assert_eq!(pool.allocate(), Err(AllocError::NoMemory));

        assert!(pool.by_addr.windows(2).all(|pair| pair[0].0 < pair[1].0));
        assert_eq!(pool.by_addr.last().map(|&(_, index)| index), Some(0));

        for ptr in &ptrs {
            assert!(pool.is_allocated(*ptr));
        }
        for ptr in ptrs {
            pool.deallocate(ptr).unwrap();
        }
        for index in 0..4 {
            assert_eq!(pool.block_used(index), Some(0));
        }
    }

    #[test]
    fn test_failed_growth_keeps_free_list_empty() {
        let (mut pool, state) = mock_pool::<u64>();
        state.fail.set(true);
        assert_eq!(pool.allocate(), Err(AllocError::NoMemory));
        assert_eq!(pool.available(), 0);
        assert!(pool.by_addr.is_empty());

        state.fail.set(false);
        let ptr = pool.allocate().unwrap();
        assert_eq!(pool.by_addr.len(), 1);
        assert_eq!(pool.by_addr[0], (ptr.as_ptr() as usize, 0));
    }

    struct DropCounter {
        drops: Rc<Cell<usize>>,
    }

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn test_allocate_with_and_destroy() {
        let (mut pool, _state) = mock_pool::<DropCounter>();
        let drops = Rc::new(Cell::new(0));
        let ptr = pool
            .allocate_with(DropCounter {
                drops: drops.clone(),
            })
            .unwrap();
        assert_eq!(Rc::strong_count(&drops), 2);

        unsafe { pool.destroy(ptr).unwrap() };
        assert_eq!(drops.get(), 1);
        assert_eq!(Rc::strong_count(&drops), 1);
        assert_eq!(pool.used(), 0);

        assert_eq!(unsafe { pool.destroy(ptr) }, Err(AllocError::NotAllocated));
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_alignment_of_every_slot() {
        #[allow(dead_code)]
        #[repr(align(128))]
        struct Wide;

        let (mut pool, _state) = mock_pool::<Wide>();
        let align = pool.layout().slot_align();
        assert_eq!(align, 128);
        let mut ptrs = vec![];
        for _ in 0..100 {
            let ptr = pool.allocate().unwrap();
            assert_eq!(ptr.as_ptr() as usize % align, 0);
            ptrs.push(ptr);
        }
        assert_eq!(pool.block_count(), 4);
    }

    #[cfg(feature = "tracking")]
    #[test]
    fn test_stats() {
        let (mut pool, state) = mock_pool::<u64>();
        let ptrs: Vec<_> = (0..70).map(|_| pool.allocate().unwrap()).collect();
        for ptr in &ptrs[..10] {
            pool.deallocate(*ptr).unwrap();
        }
        assert_eq!(pool.deallocate(ptrs[0]), Err(AllocError::NotAllocated));
        state.fail.set(true);
        for _ in 0..100 {
            if pool.allocate().is_err() {
                break;
            }
        }

        let stats = pool.stats();
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.capacity, 128);
        assert_eq!(stats.used, 128);
        assert_eq!(stats.free, 0);
        assert_eq!(stats.growth_events, 2);
        assert_eq!(stats.failed_growths, 1);
        assert_eq!(stats.peak_used, 128);
        assert_eq!(stats.rejected_frees, 1);
    }
}
