//! Cache-line-aligned slab pool for a single object type.
//!
//! This crate implements a pool allocator that hands out storage for exactly
//! one type `T`, featuring:
//! - Slots rounded up to whole cache lines, so two live objects never share one
//! - Fixed-size blocks (slabs) obtained from a pluggable [`ChunkProvider`]
//! - An intrusive LIFO free list threaded through unused slots
//! - Checked deallocation that reports foreign pointers and double frees
//! - An optional spin-locked wrapper for shared use
//!
//! ```
//! use cacheline_slab_allocator::SlabPool;
//!
//! let mut pool = SlabPool::<u64>::new();
//! let ptr = pool.allocate_with(7).unwrap();
//! assert_eq!(unsafe { *ptr.as_ptr() }, 7);
//! pool.deallocate(ptr).unwrap();
//! ```

#![no_std]

extern crate alloc;

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Cache line size every slot is rounded up to.
pub const CACHE_LINE_SIZE: usize = 64;

/// Bytes requested from the provider per growth step when no size is given.
pub const DEFAULT_CHUNK_SIZE: usize = 0x1000;

static_assertions::const_assert!(CACHE_LINE_SIZE.is_power_of_two());
static_assertions::const_assert_eq!(DEFAULT_CHUNK_SIZE % CACHE_LINE_SIZE, 0);

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Object type and chunk size do not form a valid slot layout.
    InvalidParam,
    /// The chunk provider could not supply a new block.
    NoMemory,
    /// The pointer does not address a slot of any block owned by this pool.
    NotOwned,
    /// Deallocate a slot that is currently free.
    NotAllocated,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AllocError::InvalidParam => "invalid slot layout or chunk size",
            AllocError::NoMemory => "chunk provider is out of memory",
            AllocError::NotOwned => "pointer is not a slot of this pool",
            AllocError::NotAllocated => "slot is not allocated",
        };
        f.write_str(msg)
    }
}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// Source of the raw chunks a pool carves into slots.
///
/// A pool asks for whole chunks and gives them back whole; it never frees
/// part of a chunk.
pub trait ChunkProvider {
    /// Allocate one chunk with the given size and alignment.
    fn alloc_chunk(&mut self, layout: Layout) -> AllocResult<NonNull<u8>>;

    /// Return a chunk to the provider.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`alloc_chunk`](Self::alloc_chunk) on
    /// this provider with the same `layout`, and must not be used afterwards.
    unsafe fn dealloc_chunk(&mut self, ptr: NonNull<u8>, layout: Layout);
}

#[inline]
const fn align_up(pos: usize, align: usize) -> usize {
    (pos + align - 1) & !(align - 1)
}

/// Checks whether the address has the demanded alignment.
///
/// Equivalent to `addr % align == 0`, but the alignment must be a power of two.
#[inline]
const fn is_aligned(base_addr: usize, align: usize) -> bool {
    base_addr & (align - 1) == 0
}

pub mod chunk_provider;
pub use chunk_provider::SystemChunkProvider;

pub mod slot_layout;
pub use slot_layout::SlotLayout;

pub mod slab;
#[cfg(feature = "tracking")]
pub use slab::PoolStats;
pub use slab::SlabPool;

pub mod locked_pool;
pub use locked_pool::LockedSlabPool;
