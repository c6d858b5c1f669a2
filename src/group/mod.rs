//! Group Module
//!
//! A group is a named cache namespace: a local shard, a loader for the
//! source of truth, optional peers that own other slices of the key
//! space, and a single-flight guard that collapses concurrent misses.
//!
//! # Get / Load Protocol
//! 1. Reject empty keys
//! 2. Serve shard hits directly
//! 3. On a miss, run one load per key at a time:
//!    - ask the peer picker for a remote owner and fetch from it
//!    - on peer failure, or if this node owns the key, call the loader
//!    - only locally loaded values are written to the shard

mod loader;
mod registry;

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{ByteView, CacheShard, GroupStats, StatsSnapshot};
use crate::error::{CacheError, Result};
use crate::peers::{PeerGetter, PeerPicker};
use crate::singleflight::SingleFlight;

pub use loader::{Loader, LoaderFn};
pub use registry::GroupRegistry;

struct GroupInner {
    name: String,
    loader: Arc<dyn Loader>,
    main_cache: CacheShard,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: SingleFlight<ByteView>,
    stats: GroupStats,
}

// == Group ==
/// Handle to a cache namespace. Clones share the same group.
#[derive(Clone)]
pub struct Group {
    inner: Arc<GroupInner>,
}

impl Group {
    // == Constructor ==
    /// Builds an unregistered group; use `GroupRegistry::new_group` to
    /// make it reachable by name.
    pub fn new(name: impl Into<String>, cache_bytes: usize, loader: Arc<dyn Loader>) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                name: name.into(),
                loader,
                main_cache: CacheShard::new(cache_bytes),
                peers: OnceLock::new(),
                flight: SingleFlight::new(),
                stats: GroupStats::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // == Register Peers ==
    /// Attaches the peer picker.
    ///
    /// # Panics
    /// If a picker is already attached; peer wiring happens once at startup.
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) {
        if self.inner.peers.set(peers).is_err() {
            panic!(
                "register_peers called more than once for group {}",
                self.inner.name
            );
        }
        info!(group = %self.inner.name, "peer picker registered");
    }

    // == Get ==
    /// Returns the value for `key`, loading it on a miss.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        self.get_with_cancel(key, &CancellationToken::new()).await
    }

    /// Like `get`, but gives up with `CacheError::Cancelled` once `cancel`
    /// fires. Other callers waiting on the same load are unaffected.
    pub async fn get_with_cancel(&self, key: &str, cancel: &CancellationToken) -> Result<ByteView> {
        self.inner.stats.record_get();

        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        if let Some(value) = self.inner.main_cache.get(key) {
            self.inner.stats.record_hit();
            debug!(group = %self.inner.name, key = %key, "cache hit");
            return Ok(value);
        }

        self.load(key, cancel).await
    }

    // == Load ==
    async fn load(&self, key: &str, cancel: &CancellationToken) -> Result<ByteView> {
        let group = self.clone();
        let owned_key = key.to_string();

        self.inner
            .flight
            .execute(key, cancel, move |token| async move {
                group.inner.stats.record_load();
                group.load_once(&owned_key, &token).await
            })
            .await
    }

    async fn load_once(&self, key: &str, cancel: &CancellationToken) -> Result<ByteView> {
        if let Some(peer) = self.inner.peers.get().and_then(|picker| picker.pick(key)) {
            match self.get_from_peer(peer.as_ref(), key, cancel).await {
                Ok(value) => {
                    self.inner.stats.record_peer_load();
                    return Ok(value);
                }
                Err(CacheError::Cancelled) => return Err(CacheError::Cancelled),
                Err(err) => {
                    self.inner.stats.record_peer_error();
                    warn!(
                        group = %self.inner.name,
                        key = %key,
                        error = %err,
                        "failed to get from peer, loading locally"
                    );
                }
            }
        }

        self.get_locally(key, cancel).await
    }

    /// Remote values are returned without populating the local shard;
    /// the owning peer caches them.
    async fn get_from_peer(
        &self,
        peer: &dyn PeerGetter,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<ByteView> {
        tokio::select! {
            fetched = peer.fetch(&self.inner.name, key) => fetched.map(ByteView::from),
            _ = cancel.cancelled() => Err(CacheError::Cancelled),
        }
    }

    async fn get_locally(&self, key: &str, cancel: &CancellationToken) -> Result<ByteView> {
        let loaded = tokio::select! {
            loaded = self.inner.loader.load(key) => loaded,
            _ = cancel.cancelled() => return Err(CacheError::Cancelled),
        };

        match loaded {
            Ok(bytes) => {
                let value = ByteView::from(bytes);
                self.populate_cache(key, value.clone());
                self.inner.stats.record_local_load();
                info!(group = %self.inner.name, key = %key, "loaded locally");
                Ok(value)
            }
            Err(err) => {
                self.inner.stats.record_local_load_err();
                Err(err)
            }
        }
    }

    fn populate_cache(&self, key: &str, value: ByteView) {
        self.inner.main_cache.add(key, value);
    }

    // == Stats ==
    /// Counters plus the shard's current size.
    pub fn stats(&self) -> StatsSnapshot {
        let shard = &self.inner.main_cache;
        self.inner
            .stats
            .snapshot(shard.len(), shard.used_bytes(), shard.evictions())
    }

    /// Reads the local shard without loading, counting or refreshing
    /// the entry's recency.
    pub fn peek(&self, key: &str) -> Option<ByteView> {
        self.inner.main_cache.peek(key)
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.inner.name)
            .field("cache_bytes", &self.inner.main_cache.capacity_bytes())
            .field("has_peers", &self.inner.peers.get().is_some())
            .finish()
    }
}
