//! HTTP Peer Client
//!
//! `PeerGetter` backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::peers::PeerGetter;

// == HTTP Getter ==
/// Fetches values from one remote node over the peer protocol.
#[derive(Debug, Clone)]
pub struct HttpGetter {
    /// Peer address plus protocol prefix, e.g. `http://localhost:8002/_geecache/`
    base_url: String,
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpGetter {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            timeout: None,
        }
    }

    /// Bounds each fetch by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full request URL with both segments path-escaped.
    pub fn url_for(&self, group: &str, key: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            urlencoding::encode(group),
            urlencoding::encode(key)
        )
    }
}

#[async_trait]
impl PeerGetter for HttpGetter {
    async fn fetch(&self, group: &str, key: &str) -> Result<Bytes> {
        let url = self.url_for(group, key);
        debug!(url = %url, "fetching from peer");

        let mut request = self.client.get(&url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CacheError::Peer(format!("request to {url} failed: {e}")))?;

        if response.status() != StatusCode::OK {
            return Err(CacheError::Peer(format!(
                "server returned {}",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| CacheError::Peer(format!("reading response body: {e}")))
    }
}
