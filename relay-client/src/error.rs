//! Error types for the Relay clients

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for upstream operations
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Errors returned by the upstream orders gateway
///
/// Every non-success HTTP status maps to exactly one variant; see
/// [`UpstreamError::classify`].
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Caller-side precondition failed, nothing was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The circuit breaker rejected the call without touching the network
    #[error("Upstream unavailable: circuit breaker open for {target}")]
    BreakerOpen { target: String },

    #[error("Upstream rejected the request (status 400): {message}")]
    BadRequest { message: String },

    /// 401 or 403
    #[error("Upstream authentication failed (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Upstream resource not found (status 404)")]
    NotFound,

    #[error("Upstream rate limit exceeded (status 429)")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Upstream temporarily unavailable (status 503)")]
    ServiceUnavailable,

    #[error("Upstream server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Upstream client error (status {status}): {message}")]
    ClientError { status: u16, message: String },

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl UpstreamError {
    /// Maps a response status to an error, `None` for accepted statuses
    pub fn classify(
        status: StatusCode,
        body: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Option<Self> {
        let code = status.as_u16();
        let message = body.into();

        let error = match code {
            200 | 201 | 204 => return None,
            400 => Self::BadRequest { message },
            401 | 403 => Self::Unauthorized {
                status: code,
                message,
            },
            404 => Self::NotFound,
            429 => Self::RateLimited { retry_after },
            503 => Self::ServiceUnavailable,
            500..=599 => Self::ServerError {
                status: code,
                message,
            },
            _ => Self::ClientError {
                status: code,
                message,
            },
        };

        Some(error)
    }

    /// Whether repeating the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ServiceUnavailable
                | Self::ServerError { .. }
                | Self::Transport(_)
        )
    }

    /// Credential problems, which stop pagination immediately
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Whether the upstream is considered unavailable rather than wrong
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::BreakerOpen { .. } | Self::ServiceUnavailable | Self::RateLimited { .. }
        )
    }

    /// Whether this outcome should count as a failure for the circuit breaker
    ///
    /// A coherent 4xx answer means the dependency is up.
    pub fn counts_against_breaker(&self) -> bool {
        self.is_retryable() || matches!(self, Self::Decode(_))
    }

    /// HTTP status that produced this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { .. } => Some(400),
            Self::Unauthorized { status, .. } => Some(*status),
            Self::NotFound => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::ServiceUnavailable => Some(503),
            Self::ServerError { status, .. } | Self::ClientError { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors returned by the webhook client for a single delivery attempt
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    #[error("webhook failed with status {status}")]
    Status { status: u16 },

    #[error("Failed to serialize webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
