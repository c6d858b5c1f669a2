//! Configuration Module
//!
//! Handles loading and managing node configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::peers::{PoolOptions, DEFAULT_BASE_PATH, DEFAULT_REPLICAS};

/// Node configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// This node's base URL as the other members know it
    pub self_addr: String,
    /// Base URLs of every cluster member, this node included
    pub peers: Vec<String>,
    /// Peer protocol listen port
    pub server_port: u16,
    /// Front-end API listen port; no API server when unset
    pub api_port: Option<u16>,
    /// Name of the group this node serves
    pub group_name: String,
    /// Byte capacity of the group's cache shard
    pub cache_bytes: usize,
    /// URL prefix of the peer protocol, starting and ending with `/`
    pub base_path: String,
    /// Virtual nodes per member on the hash ring
    pub replicas: usize,
    /// Timeout of a single peer fetch in milliseconds
    pub peer_timeout_ms: u64,
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Canonical spelling of a member address: no whitespace, no trailing `/`.
///
/// Ring membership and the self check compare addresses as strings.
pub fn normalize_addr(addr: &str) -> String {
    addr.trim().trim_end_matches('/').to_string()
}

/// Forces a leading and trailing slash onto a path prefix.
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SELF_ADDR` - This node's base URL (default: http://localhost:8001)
    /// - `PEERS` - Comma separated member base URLs (default: SELF_ADDR only)
    /// - `SERVER_PORT` - Peer protocol port (default: 8001)
    /// - `API_PORT` - Front-end API port (default: unset)
    /// - `GROUP_NAME` - Served group (default: scores)
    /// - `CACHE_BYTES` - Shard capacity in bytes (default: 2048)
    /// - `BASE_PATH` - Peer protocol prefix (default: /_geecache/)
    /// - `REPLICAS` - Virtual nodes per member (default: 50)
    /// - `PEER_TIMEOUT_MS` - Peer fetch timeout (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let self_addr = env::var("SELF_ADDR")
            .map(|addr| normalize_addr(&addr))
            .unwrap_or(defaults.self_addr);

        let mut peers: Vec<String> = env::var("PEERS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(normalize_addr)
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if !peers.contains(&self_addr) {
            peers.push(self_addr.clone());
        }

        Self {
            self_addr,
            peers,
            server_port: parsed("SERVER_PORT").unwrap_or(defaults.server_port),
            api_port: parsed("API_PORT"),
            group_name: env::var("GROUP_NAME").unwrap_or(defaults.group_name),
            cache_bytes: parsed("CACHE_BYTES").unwrap_or(defaults.cache_bytes),
            base_path: env::var("BASE_PATH")
                .map(|p| normalize_base_path(&p))
                .unwrap_or(defaults.base_path),
            replicas: parsed("REPLICAS").unwrap_or(defaults.replicas),
            peer_timeout_ms: parsed("PEER_TIMEOUT_MS").unwrap_or(defaults.peer_timeout_ms),
        }
    }

    /// Peer pool settings derived from this config.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            base_path: self.base_path.clone(),
            replicas: self.replicas,
            timeout: Some(Duration::from_millis(self.peer_timeout_ms)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let self_addr = "http://localhost:8001".to_string();
        Self {
            peers: vec![self_addr.clone()],
            self_addr,
            server_port: 8001,
            api_port: None,
            group_name: "scores".to_string(),
            cache_bytes: 2 << 10,
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            peer_timeout_ms: 3000,
        }
    }
}
