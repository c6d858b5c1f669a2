//! Consistent Hash Ring
//!
//! Maps keys onto peers using virtual nodes placed on a 32-bit ring.

use std::collections::HashMap;
use std::fmt;

/// Hash function used to place virtual nodes and keys on the ring.
pub type HashFn = fn(&[u8]) -> u32;

// == Hash Ring ==
/// Consistent hash over a set of peer identifiers.
///
/// Each peer owns `replicas` points, hashed from `"{i}{peer}"`. A key
/// belongs to the first point at or after its own hash, wrapping to the
/// start of the ring.
#[derive(Clone)]
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    /// Sorted virtual node hashes
    keys: Vec<u32>,
    /// Virtual node hash -> peer
    owners: HashMap<u32, String>,
}

impl HashRing {
    /// Creates a ring using CRC-32C to place nodes.
    pub fn new(replicas: usize) -> Self {
        Self::with_hash(replicas, crc32c::crc32c)
    }

    /// Creates a ring with a custom hash function.
    pub fn with_hash(replicas: usize, hash: HashFn) -> Self {
        Self {
            hash,
            replicas,
            keys: Vec::new(),
            owners: HashMap::new(),
        }
    }

    // == Add ==
    /// Places `replicas` virtual nodes for each peer.
    ///
    /// On an exact hash collision the later peer takes over the point.
    pub fn add<S: AsRef<str>>(&mut self, peers: &[S]) {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let hash = (self.hash)(format!("{i}{peer}").as_bytes());
                if self.owners.insert(hash, peer.to_string()).is_none() {
                    self.keys.push(hash);
                }
            }
        }
        self.keys.sort_unstable();
    }

    // == Get ==
    /// Returns the peer owning `key`, or `None` if the ring is empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let idx = self.keys.partition_point(|&k| k < hash);
        let point = self.keys[idx % self.keys.len()];
        self.owners.get(&point).map(String::as_str)
    }

    /// Number of virtual nodes on the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("virtual_nodes", &self.keys.len())
            .finish()
    }
}
