//! Statistics for a slab pool.

/// Pool usage statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Blocks currently owned by the pool.
    pub blocks: usize,
    /// Total slots across all blocks.
    pub capacity: usize,
    /// Slots handed out.
    pub used: usize,
    /// Slots on the free list.
    pub free: usize,
    /// Blocks created since the pool was constructed.
    pub growth_events: usize,
    /// Growth attempts the chunk provider could not satisfy.
    pub failed_growths: usize,
    /// Highest value `used` has reached.
    pub peak_used: usize,
    /// Deallocations rejected as foreign pointers or double frees.
    pub rejected_frees: usize,
}

impl PoolStats {
    pub const fn new() -> Self {
        Self {
            blocks: 0,
            capacity: 0,
            used: 0,
            free: 0,
            growth_events: 0,
            failed_growths: 0,
            peak_used: 0,
            rejected_frees: 0,
        }
    }

    pub fn record_alloc(&mut self, used: usize) {
        if used > self.peak_used {
            self.peak_used = used;
        }
    }
}
