//! Slab pool implementation.
//!
//! A pool is made of blocks (one chunk each, split into equal slots) and a
//! single intrusive free list linking every unused slot of every block.

pub(crate) mod block;
pub(crate) mod free_list;
pub mod slab_pool;
#[cfg(feature = "tracking")]
pub mod stats;

pub use slab_pool::SlabPool;
#[cfg(feature = "tracking")]
pub use stats::PoolStats;
