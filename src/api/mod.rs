//! API Module
//!
//! HTTP handlers and routing for the cache node.
//!
//! # Endpoints
//! - `GET {base_path}{group}/{key}` - Peer protocol, raw value bytes
//! - `GET /api?key=K` - Front-end lookup
//! - `GET /stats` - Per-group statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_api_router, create_peer_router};
