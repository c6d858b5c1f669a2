//! Peers Module
//!
//! Capabilities a group uses to reach the rest of the cluster, plus the
//! HTTP implementation of them.
//!
//! # Components
//! - `PeerPicker` - chooses the remote peer that owns a key
//! - `PeerGetter` - fetches a value from one remote peer
//! - `HashRing` - consistent hash used by the pool to pick owners
//! - `HttpPool` / `HttpGetter` - HTTP transport

mod client;
mod pool;
mod ring;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub use client::HttpGetter;
pub use pool::{HttpPool, PoolOptions, DEFAULT_BASE_PATH, DEFAULT_REPLICAS};
pub use ring::{HashFn, HashRing};

// == Peer Picker ==
/// Selects the peer that owns a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the remote owner of `key`.
    ///
    /// `None` when the key is owned by this node or no peers are known.
    /// Must be deterministic for a fixed peer set.
    fn pick(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

// == Peer Getter ==
/// Point-to-point fetch from one remote peer.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    /// Fetches `key` from the peer's `group`.
    ///
    /// Fails on transport errors, non-success statuses and unreadable
    /// bodies.
    async fn fetch(&self, group: &str, key: &str) -> Result<Bytes>;
}
