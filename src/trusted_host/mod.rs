//! Trusted Host internal relay.
//!
//! # Data Flow
//! ```text
//! Gatekeeper → POST /query
//!     → rate limit (higher budget than the perimeter)
//!     → circuit breaker gate (Proxy dependency)
//!     → recompute port from strategy (never trust the inbound port)
//!     → cached proxy health gate (refreshed at most once per interval)
//!     → forward to Proxy (3 attempts, fixed backoff)
//! ```
//!
//! # Design Decisions
//! - Structurally mirrors the Gatekeeper's forwarding pattern one tier
//!   down; no query validation, the perimeter already ran it
//! - The health gate short-circuits known-bad state without paying the
//!   retry/network cost

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;

use crate::api::{ApiResponse, HealthReport, QueryRequest};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::security::SlidingWindowLimiter;
use crate::strategy::Strategy;
use crate::upstream::UpstreamClient;

/// Trusted Host state, one instance per process.
pub struct TrustedHost {
    limiter: SlidingWindowLimiter,
    breaker: CircuitBreaker,
    upstream: UpstreamClient,
    retry: RetryPolicy,
    strategy: RwLock<Strategy>,
    /// Last proxy probe: (when, healthy). Reused within the interval.
    probe_cache: Mutex<Option<(Instant, bool)>>,
    probe_interval: Duration,
    started: Instant,
}

impl TrustedHost {
    pub fn new(config: &GatewayConfig) -> Self {
        tracing::info!(proxy = %config.trusted_host.proxy_url, "Trusted Host initialized");
        Self {
            limiter: SlidingWindowLimiter::new(
                config.trusted_host.rate_limit,
                Duration::from_secs(config.trusted_host.rate_window_secs),
            ),
            breaker: CircuitBreaker::new(
                config.breaker.threshold,
                Duration::from_secs(config.breaker.timeout_secs),
            ),
            upstream: UpstreamClient::new(
                config.trusted_host.proxy_url.clone(),
                Duration::from_secs(config.timeouts.forward_secs),
                Duration::from_secs(config.timeouts.probe_secs),
            ),
            retry: RetryPolicy::new(
                config.retries.max_attempts,
                Duration::from_millis(config.retries.delay_ms),
            ),
            strategy: RwLock::new(Strategy::Direct),
            probe_cache: Mutex::new(None),
            probe_interval: Duration::from_secs(config.trusted_host.health_probe_interval_secs),
            started: Instant::now(),
        }
    }

    fn strategy(&self) -> Strategy {
        *self.strategy.read().expect("strategy lock poisoned")
    }

    /// Cached proxy liveness. A probe runs at most once per interval; in
    /// between, the last observation is reused.
    async fn proxy_alive(&self) -> bool {
        {
            let cache = self.probe_cache.lock().expect("probe cache poisoned");
            if let Some((at, healthy)) = *cache {
                if at.elapsed() < self.probe_interval {
                    return healthy;
                }
            }
        }

        let healthy = match self.upstream.probe_health().await {
            Ok(report) => report.status == "ok",
            Err(err) => {
                tracing::error!(error = %err, "Proxy health check failed");
                false
            }
        };
        *self.probe_cache.lock().expect("probe cache poisoned") = Some((Instant::now(), healthy));
        healthy
    }
}

/// Build the trusted host router.
pub fn router(state: Arc<TrustedHost>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/set_strategy/{strategy}", get(set_strategy))
        .route("/query", post(query))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<Arc<TrustedHost>>) -> Json<HealthReport> {
    let proxy_status = match state.upstream.probe_health().await {
        Ok(report) if report.status == "ok" => "healthy",
        _ => "unhealthy",
    };

    let strategy = state.strategy();
    Json(HealthReport {
        status: "ok".to_string(),
        uptime: state.started.elapsed().as_secs_f64(),
        current_strategy: strategy,
        current_port: strategy.port(),
        circuit_breaker_state: Some(state.breaker.state().to_string()),
        trusted_host_status: None,
        proxy_status: Some(proxy_status.to_string()),
    })
}

async fn set_strategy(
    State(state): State<Arc<TrustedHost>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse>, GatewayError> {
    metrics::record_request("trusted_host", "set_strategy");
    let strategy = name.parse::<Strategy>().map_err(GatewayError::Validation)?;

    if !state.breaker.can_execute() {
        return Err(GatewayError::CircuitOpen);
    }

    tracing::info!(strategy = %strategy, port = strategy.port(), "Setting routing strategy");
    let upstream = &state.upstream;
    let result = state
        .retry
        .run_if(
            |attempt| {
                if attempt > 1 {
                    metrics::record_retry("trusted_host");
                }
                async move {
                    upstream
                        .get_json(&format!("/set_strategy/{}", strategy))
                        .await
                }
            },
            GatewayError::is_retryable,
        )
        .await;

    match result {
        Ok(response) => {
            state.breaker.record_success();
            if response.is_success() {
                *state.strategy.write().expect("strategy lock poisoned") = strategy;
            }
            Ok(Json(response))
        }
        Err(err) => {
            state.breaker.record_failure();
            tracing::error!(error = %err, "Failed to set strategy on Proxy");
            Err(err)
        }
    }
}

async fn query(
    State(state): State<Arc<TrustedHost>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, GatewayError> {
    metrics::record_request("trusted_host", "query");
    let client = addr.ip().to_string();

    if !state.limiter.check(&client) {
        metrics::record_rejected("trusted_host", "rate_limit");
        return Err(GatewayError::RateLimited);
    }

    if !state.breaker.can_execute() {
        metrics::record_rejected("trusted_host", "circuit_open");
        return Err(GatewayError::CircuitOpen);
    }

    let Json(request) = body.map_err(|_| {
        metrics::record_rejected("trusted_host", "malformed");
        GatewayError::Validation("Invalid request format. Must include 'query' field.".to_string())
    })?;

    // Recompute the port from the strategy; an inconsistent inbound
    // payload must not pick the data-tier path.
    let strategy = request.strategy.unwrap_or_else(|| state.strategy());
    let payload = QueryRequest {
        query: request.query,
        strategy: Some(strategy),
        port: Some(strategy.port()),
    };

    let preview: String = payload.query.chars().take(100).collect();
    tracing::info!(strategy = %strategy, port = strategy.port(), query = %preview, "Processing query");

    if !state.proxy_alive().await {
        metrics::record_rejected("trusted_host", "proxy_down");
        return Err(GatewayError::ProxyUnavailable);
    }

    let upstream = &state.upstream;
    let payload = &payload;
    let result = state
        .retry
        .run_if(
            |attempt| {
                if attempt > 1 {
                    metrics::record_retry("trusted_host");
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
            state.breaker.record_failure();
            tracing::error!(error = %err, "Failed to forward query to Proxy");
            Err(err)
        }
    }
}
