//! Mini Groupcache - A read-through, peer-distributed in-memory cache
//!
//! Values are grouped into named namespaces, loaded on a miss from a
//! user-supplied source, bounded by LRU eviction, sharded across peers
//! with consistent hashing, and loaded at most once per key at a time.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod group;
pub mod models;
pub mod peers;
pub mod singleflight;

pub use api::AppState;
pub use cache::ByteView;
pub use config::Config;
pub use error::{CacheError, Result};
pub use group::{Group, GroupRegistry, Loader, LoaderFn};
pub use peers::{HttpPool, PeerGetter, PeerPicker};
