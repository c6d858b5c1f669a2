//! Request DTOs for the cache node API
//!
//! Defines the structure of incoming query strings.

use serde::Deserialize;

/// Query string of the front-end lookup (GET /api?key=K)
///
/// A missing key is treated as empty and rejected by the group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiQuery {
    /// The key to look up
    #[serde(default)]
    pub key: Option<String>,
}
