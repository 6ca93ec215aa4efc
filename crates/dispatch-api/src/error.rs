//! API error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dispatch_hooks::HookError;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error type for consistent error responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - unparseable body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid webhook signature.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A tracker call made on behalf of the request failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(status = status.as_u16(), error = %self, "request failed");
        let body = Json(json!({
            "error": self.to_string()
        }));
        (status, body).into_response()
    }
}

impl From<HookError> for ApiError {
    fn from(err: HookError) -> Self {
        match err {
            HookError::Payload { .. } => ApiError::BadRequest(err.to_string()),
            HookError::Worker(_) => ApiError::Upstream(err.to_string()),
            HookError::Transcript { .. } | HookError::Settings { .. } => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<dispatch_work::QueueError> for ApiError {
    fn from(err: dispatch_work::QueueError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
