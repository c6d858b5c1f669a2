//! Cache Module
//!
//! Immutable values, the byte-bounded LRU store and the locked shard
//! that a group keeps its locally loaded values in.

mod byteview;
mod lru;
mod shard;
mod stats;


// Re-export public types
pub use byteview::ByteView;
pub use lru::{ByteSize, EvictionCallback, LruStore};
pub use shard::CacheShard;
pub use stats::{GroupStats, StatsSnapshot};
