//! Gateway error taxonomy.
//!
//! # Responsibilities
//! - Classify failures so each tier reacts correctly (retry vs terminal)
//! - Convert every error into the JSON `{status, message}` envelope
//!
//! # Design Decisions
//! - Validation, rate-limit, and circuit-open errors are terminal
//! - Timeout/connection errors are retried up to the hop's budget
//! - Database detail surfaces only at the proxy tier; upstream tiers
//!   return a generic service error

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::api::ApiResponse;

/// Errors surfaced by gateway tiers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Rejected by perimeter validation rules. Never retried.
    #[error("{0}")]
    Validation(String),

    /// Caller exceeded its sliding-window budget.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Local circuit breaker is open; upstream is known bad.
    #[error("Service temporarily unavailable")]
    CircuitOpen,

    /// Cached health gate reports the proxy down; forwarding skipped.
    #[error("Proxy service unavailable")]
    ProxyUnavailable,

    /// The downstream tier did not answer within the hop timeout.
    #[error("Request timed out")]
    UpstreamTimeout,

    /// Could not reach the downstream tier at all.
    #[error("Connection to internal service failed")]
    UpstreamConnection,

    /// Downstream answered with a non-success HTTP status.
    #[error("Upstream service error (status {0})")]
    UpstreamStatus(u16),

    /// Driver-reported database error, detailed at the proxy tier.
    #[error("MySQL Error: {0}")]
    Database(String),

    /// Could not open a database connection.
    #[error("Failed to connect to MySQL on {0}")]
    Connect(String),

    /// Anything unexpected; deliberately opaque.
    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// Whether a forwarding hop may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::UpstreamTimeout
                | GatewayError::UpstreamConnection
                | GatewayError::UpstreamStatus(_)
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::CircuitOpen | GatewayError::ProxyUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamConnection | GatewayError::UpstreamStatus(_) => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Database(_) | GatewayError::Connect(_) | GatewayError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // The envelope always carries a `status` field; a raw fault never
        // escapes a handler.
        let message = match &self {
            GatewayError::UpstreamStatus(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (self.status_code(), Json(ApiResponse::error(message))).into_response()
    }
}
