//! Error types for the distributed cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for groups, peers and the HTTP layer.
///
/// `Clone` so that one load result can be handed to every caller
/// waiting on the same in-flight call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Empty key passed to `get`
    #[error("key is required")]
    InvalidKey,

    /// The backing source has no value for the key
    #[error("{0} not exist")]
    NotFound(String),

    /// No group registered under this name
    #[error("no such group: {0}")]
    GroupNotFound(String),

    /// Backing source failed for a reason other than a missing key
    #[error("loader failed: {0}")]
    Loader(String),

    /// Remote peer fetch failed
    #[error("peer fetch failed: {0}")]
    Peer(String),

    /// Malformed peer protocol request
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Caller abandoned the wait
    #[error("request cancelled")]
    Cancelled,

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// HTTP status this error maps to on the wire.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::InvalidKey | CacheError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_)
            | CacheError::GroupNotFound(_)
            | CacheError::Loader(_)
            | CacheError::Peer(_) => StatusCode::NOT_FOUND,
            CacheError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(CacheError::InvalidKey.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            CacheError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CacheError::GroupNotFound("g".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CacheError::Loader("boom".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CacheError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(CacheError::InvalidKey.to_string(), "key is required");
        assert_eq!(
            CacheError::NotFound("unknown".into()).to_string(),
            "unknown not exist"
        );
        assert_eq!(
            CacheError::GroupNotFound("scores".into()).to_string(),
            "no such group: scores"
        );
    }
}
