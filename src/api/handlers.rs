//! API Handlers
//!
//! HTTP request handlers for the peer protocol and the front-end API.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::ByteView;
use crate::error::{CacheError, Result};
use crate::group::GroupRegistry;
use crate::models::{ApiQuery, HealthResponse, StatsResponse};

/// Content type used for raw cached values
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Groups reachable by name
    pub registry: Arc<GroupRegistry>,
    /// Group served by the front-end `/api` route
    pub api_group: String,
    /// Fired on shutdown so in-flight waits stop promptly
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Creates a new AppState over the given registry.
    pub fn new(registry: Arc<GroupRegistry>, api_group: impl Into<String>) -> Self {
        Self {
            registry,
            api_group: api_group.into(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Looks up `name`, loading `key` from it.
    async fn get_value(&self, group_name: &str, key: &str) -> Result<ByteView> {
        let group = self
            .registry
            .get_group(group_name)
            .ok_or_else(|| CacheError::GroupNotFound(group_name.to_string()))?;

        group.get_with_cancel(key, &self.shutdown).await
    }
}

fn octet_stream(value: ByteView) -> Response {
    ([(header::CONTENT_TYPE, OCTET_STREAM)], value.bytes()).into_response()
}

/// Splits `{group}/{key}` into its two non-empty segments.
pub fn parse_peer_path(rest: &str) -> Result<(&str, &str)> {
    match rest.split_once('/') {
        Some((group, key)) if !group.is_empty() && !key.is_empty() => Ok((group, key)),
        _ => Err(CacheError::BadRequest(format!(
            "expected {{group}}/{{key}}, got {rest:?}"
        ))),
    }
}

/// Handler for GET {base_path}{group}/{key}
///
/// Serves one value to a peer node as raw bytes.
pub async fn peer_handler(
    State(state): State<AppState>,
    Path(rest): Path<String>,
) -> Result<Response> {
    let (group, key) = parse_peer_path(&rest)?;
    debug!(group = %group, key = %key, "peer request");

    let value = state.get_value(group, key).await?;
    Ok(octet_stream(value))
}

/// Handler for GET {base_path}
///
/// The bare prefix names neither a group nor a key.
pub async fn peer_root_handler() -> CacheError {
    CacheError::BadRequest("expected {group}/{key} after the base path".to_string())
}

/// Handler for GET /api?key=K
///
/// Front-end lookup in the configured group.
pub async fn api_handler(
    State(state): State<AppState>,
    Query(query): Query<ApiQuery>,
) -> Result<Response> {
    let key = query.key.unwrap_or_default();
    let value = state.get_value(&state.api_group, &key).await?;
    Ok(octet_stream(value))
}

/// Handler for GET /stats
///
/// Returns per-group statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let groups = state
        .registry
        .groups()
        .into_iter()
        .map(|group| (group.name().to_string(), group.stats()))
        .collect::<BTreeMap<_, _>>();

    Json(StatsResponse { groups })
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
