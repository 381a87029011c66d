//! Gatekeeper perimeter service.
//!
//! # Data Flow
//! ```text
//! client → POST /query
//!     → rate limit (per client IP)
//!     → circuit breaker gate (Trusted Host dependency)
//!     → body shape + size guard
//!     → lexical query validation
//!     → attach cached {strategy, port}
//!     → forward to Trusted Host (3 attempts, fixed backoff)
//!     → downstream envelope returned verbatim
//! ```
//!
//! # Design Decisions
//! - The only externally reachable tier; validation runs here once and
//!   downstream tiers trust the result
//! - Breaker failure is recorded only after the attempt budget is
//!   exhausted, success on any attempt resets it
//! - Connection/timeout faults surface as generic unavailable errors,
//!   never a raw fault

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;

use crate::api::{ApiResponse, HealthReport, QueryRequest};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::security::{QueryValidator, SlidingWindowLimiter};
use crate::strategy::Strategy;
use crate::upstream::UpstreamClient;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Gatekeeper state, one instance per process, shared across handlers.
pub struct Gatekeeper {
    validator: QueryValidator,
    limiter: SlidingWindowLimiter,
    breaker: CircuitBreaker,
    upstream: UpstreamClient,
    retry: RetryPolicy,
    strategy: RwLock<Strategy>,
    started: Instant,
}

impl Gatekeeper {
    pub fn new(config: &GatewayConfig) -> Self {
        tracing::info!(
            trusted_host = %config.gatekeeper.trusted_host_url,
            "Gatekeeper initialized"
        );
        Self {
            validator: QueryValidator::new(),
            limiter: SlidingWindowLimiter::new(
                config.gatekeeper.rate_limit,
                Duration::from_secs(config.gatekeeper.rate_window_secs),
            ),
            breaker: CircuitBreaker::new(
                config.breaker.threshold,
                Duration::from_secs(config.breaker.timeout_secs),
            ),
            upstream: UpstreamClient::new(
                config.gatekeeper.trusted_host_url.clone(),
                Duration::from_secs(config.timeouts.forward_secs),
                Duration::from_secs(config.timeouts.probe_secs),
            ),
            retry: RetryPolicy::new(
                config.retries.max_attempts,
                Duration::from_millis(config.retries.delay_ms),
            ),
            strategy: RwLock::new(Strategy::Direct),
            started: Instant::now(),
        }
    }

    fn strategy(&self) -> Strategy {
        *self.strategy.read().expect("strategy lock poisoned")
    }
}

/// Build the gatekeeper router.
pub fn router(state: Arc<Gatekeeper>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/set_strategy/{strategy}", get(set_strategy))
        .route("/query", post(query))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<Arc<Gatekeeper>>) -> Json<HealthReport> {
    let trusted_host_status = match state.upstream.probe_health().await {
        Ok(report) => report.status,
        Err(err) => {
            tracing::warn!(error = %err, "Trusted Host health probe failed");
            "unhealthy".to_string()
        }
    };

    let strategy = state.strategy();
    Json(HealthReport {
        status: "ok".to_string(),
        uptime: state.started.elapsed().as_secs_f64(),
        current_strategy: strategy,
        current_port: strategy.port(),
        circuit_breaker_state: Some(state.breaker.state().to_string()),
        trusted_host_status: Some(trusted_host_status),
        proxy_status: None,
    })
}

async fn set_strategy(
    State(state): State<Arc<Gatekeeper>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse>, GatewayError> {
    metrics::record_request("gatekeeper", "set_strategy");
    let strategy = name.parse::<Strategy>().map_err(GatewayError::Validation)?;

    tracing::info!(strategy = %strategy, port = strategy.port(), "Setting routing strategy");
    let response = state
        .upstream
        .get_json(&format!("/set_strategy/{}", strategy))
        .await?;

    if response.is_success() {
        *state.strategy.write().expect("strategy lock poisoned") = strategy;
        tracing::info!(strategy = %strategy, "Strategy set successfully");
    }
    Ok(Json(response))
}

async fn query(
    State(state): State<Arc<Gatekeeper>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, GatewayError> {
    metrics::record_request("gatekeeper", "query");
    let client = addr.ip().to_string();

    if !state.limiter.check(&client) {
        metrics::record_rejected("gatekeeper", "rate_limit");
        return Err(GatewayError::RateLimited);
    }

    if !state.breaker.can_execute() {
        tracing::warn!("Circuit breaker is open, rejecting request");
        metrics::record_rejected("gatekeeper", "circuit_open");
        return Err(GatewayError::CircuitOpen);
    }

    let Json(request) = body.map_err(|rejection| {
        metrics::record_rejected("gatekeeper", "malformed");
        match rejection {
            JsonRejection::BytesRejection(_) => {
                GatewayError::Validation("Request too large".to_string())
            }
            _ => GatewayError::Validation(
                "Invalid request format. Must include 'query' field.".to_string(),
            ),
        }
    })?;

    let preview: String = request.query.chars().take(100).collect();
    tracing::info!(client = %client, query = %preview, "Processing query");

    state.validator.validate(&request.query).map_err(|reason| {
        tracing::warn!(client = %client, reason = %reason, "Query validation failed");
        metrics::record_rejected("gatekeeper", "validation");
        GatewayError::Validation(reason)
    })?;

    let strategy = state.strategy();
    let payload = QueryRequest {
        query: request.query,
        strategy: Some(strategy),
        port: Some(strategy.port()),
    };
    tracing::info!(strategy = %strategy, port = strategy.port(), "Query validated, forwarding to Trusted Host");

    let upstream = &state.upstream;
    let payload = &payload;
    let result = state
        .retry
        .run_if(
            |attempt| {
                if attempt > 1 {
                    metrics::record_retry("gatekeeper");
                }
                async move { upstream.post_json("/query", payload).await }
            },
            GatewayError::is_retryable,
        )
        .await;

    match result {
        Ok(response) => {
            state.breaker.record_success();
            Ok(Json(response))
        }
        Err(err) => {
            // Only the terminal failure counts against the breaker.
            state.breaker.record_failure();
            tracing::error!(error = %err, "Failed to forward query to Trusted Host");
            Err(err)
        }
    }
}
