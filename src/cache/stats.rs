//! Group Statistics Module
//!
//! Tracks per-group counters for gets, hits, loads and peer traffic.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Group Stats ==
/// Lock-free counters updated on the get/load path.
#[derive(Debug, Default)]
pub struct GroupStats {
    gets: AtomicU64,
    cache_hits: AtomicU64,
    loads: AtomicU64,
    peer_loads: AtomicU64,
    peer_errors: AtomicU64,
    local_loads: AtomicU64,
    local_load_errs: AtomicU64,
}

impl GroupStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// One load execution, after single-flight collapsing.
    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_peer_load(&self) {
        self.peer_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_peer_error(&self) {
        self.peer_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_load(&self) {
        self.local_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_load_err(&self) {
        self.local_load_errs.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters into a serializable snapshot.
    ///
    /// Shard figures are supplied by the caller since they live
    /// behind the shard's own lock.
    pub fn snapshot(&self, items: usize, bytes: usize, evictions: u64) -> StatsSnapshot {
        let gets = self.gets.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let hit_rate = if gets == 0 {
            0.0
        } else {
            cache_hits as f64 / gets as f64
        };

        StatsSnapshot {
            gets,
            cache_hits,
            loads: self.loads.load(Ordering::Relaxed),
            peer_loads: self.peer_loads.load(Ordering::Relaxed),
            peer_errors: self.peer_errors.load(Ordering::Relaxed),
            local_loads: self.local_loads.load(Ordering::Relaxed),
            local_load_errs: self.local_load_errs.load(Ordering::Relaxed),
            items,
            bytes,
            evictions,
            hit_rate,
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time view of a group's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Every `get` call, including rejected ones
    pub gets: u64,
    /// Gets served straight from the shard
    pub cache_hits: u64,
    /// Load executions after in-flight collapsing
    pub loads: u64,
    /// Loads satisfied by a remote peer
    pub peer_loads: u64,
    /// Remote fetches that failed and fell back to the local loader
    pub peer_errors: u64,
    /// Successful local loader calls
    pub local_loads: u64,
    /// Failed local loader calls
    pub local_load_errs: u64,
    /// Entries in the shard
    pub items: usize,
    /// Bytes held by the shard
    pub bytes: usize,
    /// Entries evicted from the shard
    pub evictions: u64,
    /// cache_hits / gets
    pub hit_rate: f64,
}
