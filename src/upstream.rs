//! Typed JSON-over-HTTP client for inter-tier forwarding.
//!
//! # Responsibilities
//! - POST query payloads and GET admin/health endpoints downstream
//! - Enforce the hop timeout (30s forwarding, 5s health probes)
//! - Classify transport failures as timeout vs connection errors
//!
//! # Design Decisions
//! - Non-2xx downstream statuses are treated as attempt failures, so the
//!   retry/breaker machinery sees them; 2xx envelopes pass through
//!   verbatim
//! - Each outgoing request carries an `x-request-id` for correlation

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::api::{ApiResponse, HealthReport};
use crate::error::GatewayError;

/// Largest downstream response body we will buffer.
const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// HTTP client bound to one downstream tier.
pub struct UpstreamClient {
    base: String,
    client: Client<HttpConnector, Body>,
    forward_timeout: Duration,
    probe_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(base: impl Into<String>, forward_timeout: Duration, probe_timeout: Duration) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            base,
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            forward_timeout,
            probe_timeout,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// POST a JSON body and return the downstream envelope.
    pub async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, GatewayError> {
        let bytes = serde_json::to_vec(body).map_err(|_| GatewayError::Internal)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("{}{}", self.base, path))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", Uuid::new_v4().to_string())
            .body(Body::from(bytes))
            .map_err(|_| GatewayError::Internal)?;

        self.expect_success(request, self.forward_timeout).await
    }

    /// GET an admin endpoint and return the downstream envelope.
    pub async fn get_json(&self, path: &str) -> Result<ApiResponse, GatewayError> {
        let request = self.get_request(path)?;
        self.expect_success(request, self.forward_timeout).await
    }

    /// Probe `GET /health` with the short probe timeout.
    pub async fn probe_health(&self) -> Result<HealthReport, GatewayError> {
        let request = self.get_request("/health")?;
        let (status, body) = self.send(request, self.probe_timeout).await?;
        if !status.is_success() {
            return Err(GatewayError::UpstreamStatus(status.as_u16()));
        }
        serde_json::from_slice(&body).map_err(|_| GatewayError::Internal)
    }

    fn get_request(&self, path: &str) -> Result<Request<Body>, GatewayError> {
        Request::builder()
            .method(Method::GET)
            .uri(format!("{}{}", self.base, path))
            .header("x-request-id", Uuid::new_v4().to_string())
            .body(Body::empty())
            .map_err(|_| GatewayError::Internal)
    }

    async fn expect_success<T: DeserializeOwned>(
        &self,
        request: Request<Body>,
        timeout: Duration,
    ) -> Result<T, GatewayError> {
        let (status, body) = self.send(request, timeout).await?;
        if !status.is_success() {
            return Err(GatewayError::UpstreamStatus(status.as_u16()));
        }
        serde_json::from_slice(&body).map_err(|_| GatewayError::Internal)
    }

    async fn send(
        &self,
        request: Request<Body>,
        timeout: Duration,
    ) -> Result<(StatusCode, axum::body::Bytes), GatewayError> {
        let response = match tokio::time::timeout(timeout, self.client.request(request)).await {
            Err(_) => return Err(GatewayError::UpstreamTimeout),
            Ok(Err(err)) => {
                tracing::debug!(error = %err, upstream = %self.base, "Upstream transport error");
                return Err(GatewayError::UpstreamConnection);
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
            .await
            .map_err(|_| GatewayError::Internal)?;
        Ok((status, body))
    }
}
