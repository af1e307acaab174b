//! Default chunk provider backed by the global allocator.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::{AllocError, AllocResult, ChunkProvider};

/// Chunk provider that forwards to the global allocator (`alloc::alloc`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemChunkProvider;

impl ChunkProvider for SystemChunkProvider {
    fn alloc_chunk(&mut self, layout: Layout) -> AllocResult<NonNull<u8>> {
        if layout.size() == 0 {
            return Err(AllocError::InvalidParam);
        }
        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError::NoMemory)
    }

    unsafe fn dealloc_chunk(&mut self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) };
    }
}
