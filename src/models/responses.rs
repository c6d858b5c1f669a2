//! Response DTOs for the cache node API
//!
//! Defines the structure of outgoing JSON bodies. Values themselves are
//! served as raw bytes, not JSON.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::StatsSnapshot;

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsResponse {
    /// Statistics keyed by group name
    pub groups: BTreeMap<String, StatsSnapshot>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
