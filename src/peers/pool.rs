//! HTTP Peer Pool
//!
//! Owns the consistent hash over all cluster members and one
//! `HttpGetter` per remote member.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::peers::{HashRing, HttpGetter, PeerGetter, PeerPicker};

// == Public Constants ==
/// Default URL prefix of the peer protocol
pub const DEFAULT_BASE_PATH: &str = "/_geecache/";

/// Default number of virtual nodes per peer
pub const DEFAULT_REPLICAS: usize = 50;

// == Pool Options ==
/// Tunables for an `HttpPool`.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub base_path: String,
    pub replicas: usize,
    /// Per-fetch timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            timeout: None,
        }
    }
}

#[derive(Debug)]
struct PoolState {
    ring: HashRing,
    getters: HashMap<String, Arc<HttpGetter>>,
}

// == HTTP Pool ==
/// `PeerPicker` over a fixed set of HTTP peers.
#[derive(Debug)]
pub struct HttpPool {
    /// This node's own address, e.g. `http://localhost:8001`
    self_addr: String,
    options: PoolOptions,
    client: reqwest::Client,
    state: Mutex<PoolState>,
}

impl HttpPool {
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self::with_options(self_addr, PoolOptions::default())
    }

    pub fn with_options(self_addr: impl Into<String>, options: PoolOptions) -> Self {
        let state = PoolState {
            ring: HashRing::new(options.replicas),
            getters: HashMap::new(),
        };
        Self {
            self_addr: self_addr.into(),
            options,
            client: reqwest::Client::new(),
            state: Mutex::new(state),
        }
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub fn base_path(&self) -> &str {
        &self.options.base_path
    }

    // == Set Peers ==
    /// Replaces the peer set with `peers`, which should include this node.
    ///
    /// Every member goes on the ring; only remote members get a getter.
    pub fn set_peers<S: AsRef<str>>(&self, peers: &[S]) {
        let members: Vec<&str> = peers.iter().map(|peer| peer.as_ref()).collect();
        let mut ring = HashRing::new(self.options.replicas);
        ring.add(&members);

        let getters = members
            .iter()
            .copied()
            .filter(|peer| *peer != self.self_addr)
            .map(|peer| {
                let mut getter = HttpGetter::new(
                    format!("{}{}", peer, self.options.base_path),
                    self.client.clone(),
                );
                if let Some(timeout) = self.options.timeout {
                    getter = getter.with_timeout(timeout);
                }
                (peer.to_string(), Arc::new(getter))
            })
            .collect::<HashMap<_, _>>();

        info!(
            self_addr = %self.self_addr,
            members = members.len(),
            remotes = getters.len(),
            "peer set updated"
        );

        let mut state = self.state.lock();
        state.ring = ring;
        state.getters = getters;
    }

    /// Address of the member that owns `key`, local or not.
    pub fn owner_of(&self, key: &str) -> Option<String> {
        self.state.lock().ring.get(key).map(str::to_string)
    }
}

impl PeerPicker for HttpPool {
    fn pick(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.lock();
        let peer = state.ring.get(key)?;
        if peer == self.self_addr {
            return None;
        }

        debug!(self_addr = %self.self_addr, peer = %peer, key = %key, "pick peer");
        let getter: Arc<dyn PeerGetter> = state.getters.get(peer)?.clone();
        Some(getter)
    }
}
