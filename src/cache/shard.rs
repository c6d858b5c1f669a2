//! Cache Shard Module
//!
//! Thread-safe wrapper around one lazily created `LruStore`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{ByteView, LruStore};

// == Cache Shard ==
/// Mutex-guarded LRU store holding a group's locally owned values.
///
/// The store is only built on the first `add`; lookups before that
/// report a miss without allocating.
#[derive(Debug)]
pub struct CacheShard {
    cache_bytes: usize,
    lru: Mutex<Option<LruStore<ByteView>>>,
    evictions: Arc<AtomicU64>,
}

impl CacheShard {
    /// Creates a shard bounded at `cache_bytes` (0 = unbounded).
    pub fn new(cache_bytes: usize) -> Self {
        Self {
            cache_bytes,
            lru: Mutex::new(None),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    // == Add ==
    /// Stores a value, evicting under the same lock if over capacity.
    pub fn add(&self, key: &str, value: ByteView) {
        let mut guard = self.lru.lock();
        let lru = guard.get_or_insert_with(|| {
            let evictions = self.evictions.clone();
            LruStore::with_eviction_callback(
                self.cache_bytes,
                Box::new(move |key: String, _value: ByteView| {
                    evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "evicted from cache shard");
                }),
            )
        });
        lru.add(key, value);
    }

    // == Get ==
    /// Looks up a value, refreshing its recency on a hit.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut guard = self.lru.lock();
        guard.as_mut()?.get(key).cloned()
    }

    /// Looks up a value without touching its recency.
    pub fn peek(&self, key: &str) -> Option<ByteView> {
        self.lru.lock().as_ref()?.peek(key).cloned()
    }

    // == Accessors ==
    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lru.lock().as_ref().map_or(0, |lru| lru.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently held.
    pub fn used_bytes(&self) -> usize {
        self.lru.lock().as_ref().map_or(0, |lru| lru.used_bytes())
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn capacity_bytes(&self) -> usize {
        self.cache_bytes
    }

    /// True once the first value has been stored.
    pub fn is_initialized(&self) -> bool {
        self.lru.lock().is_some()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_get_before_add_does_not_allocate() {
        let shard = CacheShard::new(64);
        assert!(shard.get("missing").is_none());
        assert!(!shard.is_initialized());
    }

    #[test]
    fn test_add_then_get() {
        let shard = CacheShard::new(64);
        shard.add("Tom", ByteView::from("630"));

        assert!(shard.is_initialized());
        assert_eq!(shard.get("Tom").unwrap().to_string(), "630");
        assert_eq!(shard.len(), 1);
        assert_eq!(shard.used_bytes(), 6);
    }

    #[test]
    fn test_evictions_are_counted() {
        let shard = CacheShard::new(8);
        shard.add("a", ByteView::from("aaa"));
        shard.add("b", ByteView::from("bbb"));
        shard.add("c", ByteView::from("ccc"));

        assert_eq!(shard.evictions(), 1);
        assert!(shard.get("a").is_none());
        assert!(shard.used_bytes() <= shard.capacity_bytes());
    }

    #[test]
    fn test_peek_does_not_change_eviction_order() {
        let shard = CacheShard::new(8);
        shard.add("a", ByteView::from("aaa"));
        shard.add("b", ByteView::from("bbb"));

        // A get here would save "a"; a peek must not
        assert_eq!(shard.peek("a").unwrap().to_string(), "aaa");
        shard.add("c", ByteView::from("ccc"));

        assert!(shard.peek("a").is_none());
        assert!(shard.peek("b").is_some());
        assert!(shard.peek("c").is_some());
    }

    #[test]
    fn test_concurrent_adds_respect_capacity() {
        let shard = Arc::new(CacheShard::new(256));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let shard = shard.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        shard.add(&format!("t{t}-k{i}"), ByteView::from("value"));
                        let _ = shard.get(&format!("t{t}-k{}", i / 2));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(shard.used_bytes() <= 256);
        assert!(shard.evictions() > 0);
    }
}
