//! Proxy routing engine HTTP surface.
//!
//! # Data Flow
//! ```text
//! Trusted Host → POST /query → classify read/write → engine.route
//!              → GET /set_strategy/{name} → engine.set_strategy
//!              → GET /health → uptime + strategy report
//! ```
//!
//! # Design Decisions
//! - Query responses are always HTTP 200 with a `status` envelope so
//!   upstream tiers pass database errors through verbatim instead of
//!   retrying them

pub mod engine;
pub mod executor;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;

use crate::api::{ApiResponse, HealthReport, QueryRequest};
use crate::config::GatewayConfig;
use crate::observability::metrics;
use crate::strategy::Strategy;

use engine::{ClusterTopology, RoutingEngine};
use executor::MySqlExecutor;

/// Proxy tier state, shared across handler tasks.
pub struct ProxyService {
    engine: RoutingEngine,
    started: Instant,
}

impl ProxyService {
    /// Build the service from config, wiring the MySQL executor.
    pub fn new(config: &GatewayConfig) -> Self {
        let connect_timeout = Duration::from_secs(config.proxy.connect_timeout_secs);
        let executor = Arc::new(MySqlExecutor::new(
            config.proxy.mysql_user.clone(),
            config.proxy.mysql_password.clone(),
            config.proxy.database.clone(),
            connect_timeout,
        ));
        let topology = ClusterTopology {
            manager: config.proxy.manager_host.clone(),
            workers: config.proxy.worker_hosts.clone(),
        };
        Self {
            engine: RoutingEngine::new(topology, executor, connect_timeout),
            started: Instant::now(),
        }
    }

    /// Test/embedding constructor with a custom executor.
    pub fn with_engine(engine: RoutingEngine) -> Self {
        Self {
            engine,
            started: Instant::now(),
        }
    }
}

/// Build the proxy router.
pub fn router(state: Arc<ProxyService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/set_strategy/{strategy}", get(set_strategy))
        .route("/query", post(query))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<Arc<ProxyService>>) -> Json<HealthReport> {
    let strategy = state.engine.strategy();
    Json(HealthReport {
        status: "ok".to_string(),
        uptime: state.started.elapsed().as_secs_f64(),
        current_strategy: strategy,
        current_port: strategy.port(),
        circuit_breaker_state: None,
        trusted_host_status: None,
        proxy_status: None,
    })
}

async fn set_strategy(
    State(state): State<Arc<ProxyService>>,
    Path(name): Path<String>,
) -> Response {
    metrics::record_request("proxy", "set_strategy");
    match name.parse::<Strategy>() {
        Ok(strategy) => {
            state.engine.set_strategy(strategy);
            Json(ApiResponse::strategy_changed(strategy)).into_response()
        }
        Err(message) => {
            tracing::error!(strategy = %name, "Invalid strategy");
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message))).into_response()
        }
    }
}

async fn query(
    State(state): State<Arc<ProxyService>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    metrics::record_request("proxy", "query");
    let Ok(Json(request)) = body else {
        return Json(ApiResponse::error("No query provided"));
    };

    let preview: String = request.query.chars().take(100).collect();
    tracing::info!(query = %preview, "Received query");

    Json(state.engine.route(&request.query).await)
}
