//! API Routes
//!
//! Configures the Axum routers for the peer protocol and the front-end API.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    api_handler, health_handler, peer_handler, peer_root_handler, stats_handler, AppState,
};

/// Creates the router other nodes fetch values from.
///
/// # Endpoints
/// - `GET {base_path}{group}/{key}` - Raw value bytes
/// - `GET {base_path}` - Always 400, no group or key given
/// - `GET /health` - Health check endpoint
///
/// `base_path` must start and end with `/`.
pub fn create_peer_router(state: AppState, base_path: &str) -> Router {
    Router::new()
        .route(base_path, get(peer_root_handler))
        .route(&format!("{base_path}*rest"), get(peer_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the user-facing router.
///
/// # Endpoints
/// - `GET /api?key=K` - Value of `K` in the configured group
/// - `GET /stats` - Per-group statistics
/// - `GET /health` - Health check endpoint
pub fn create_api_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api", get(api_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
