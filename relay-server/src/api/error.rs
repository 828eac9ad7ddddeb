//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use relay_client::UpstreamError;
use relay_pipeline::PipelineError;

use crate::validation::ValidationError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Upstream rejected the caller's credentials
    Unauthorized(String),
    /// Upstream is down, throttling, or the breaker is open
    Unavailable(String),
    /// Upstream answered with something unusable
    BadGateway(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Unavailable(msg) => {
                tracing::warn!("Upstream unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            ApiError::BadGateway(msg) => {
                tracing::error!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        let message = err.to_string();
        if err.is_auth() {
            ApiError::Unauthorized(message)
        } else if err.is_unavailable() {
            ApiError::Unavailable(message)
        } else if matches!(err, UpstreamError::InvalidRequest(_)) {
            ApiError::BadRequest(message)
        } else {
            ApiError::BadGateway(message)
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            PipelineError::Fetch(e) => e.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
