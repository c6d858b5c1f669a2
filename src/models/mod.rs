//! Data Models
//!
//! Request and response DTOs for the HTTP API.

pub mod requests;
pub mod responses;

// Re-export all models
pub use requests::ApiQuery;
pub use responses::{HealthResponse, StatsResponse};
