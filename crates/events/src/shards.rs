//! Deterministic shard assignment for parallel, order-preserving consumption.
//!
//! Every event is tagged with a shard in `[0, N)` derived purely from its
//! owning company id. All events of one company land in the same shard, so a
//! per-shard consumer sees them in log order; different companies interleave
//! across shards, enabling N-way parallel projection.

use freightbook_core::CompanyId;

/// Fixed-size shard space for the company event log.
///
/// `N` is fixed at log-creation time. Changing it reassigns ids to shards and
/// therefore requires a full read-side rebuild.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EventShards {
    num_shards: u32,
}

impl EventShards {
    /// Shard count used by the company journal.
    pub const DEFAULT_NUM_SHARDS: u32 = 4;

    /// Create a shard space with `num_shards` shards.
    ///
    /// `num_shards` must be at least 1.
    pub fn new(num_shards: u32) -> Self {
        assert!(num_shards >= 1, "shard count must be at least 1");
        Self { num_shards }
    }

    pub fn num_shards(&self) -> u32 {
        self.num_shards
    }

    /// Assign a shard to a company id.
    ///
    /// Computed over the id's 128-bit value so the assignment is stable
    /// across processes, architectures, and compiler versions (std's hashers
    /// make no such guarantee).
    pub fn shard_for(&self, id: &CompanyId) -> u32 {
        (id.as_uuid().as_u128() % u128::from(self.num_shards)) as u32
    }

    /// All shard numbers in this space.
    pub fn all(&self) -> std::ops::Range<u32> {
        0..self.num_shards
    }
}

impl Default for EventShards {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NUM_SHARDS)
    }
}
