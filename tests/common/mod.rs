//! Shared utilities for integration testing: in-process tiers on
//! ephemeral ports and a programmable stub Proxy.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use db_gateway::api::{ApiResponse, HealthReport, QueryRequest};
use db_gateway::config::GatewayConfig;
use db_gateway::strategy::Strategy;
use db_gateway::{gatekeeper, trusted_host};

/// Observable state of the stub Proxy tier.
#[derive(Clone)]
pub struct StubProxy {
    pub queries: Arc<Mutex<Vec<QueryRequest>>>,
    pub strategy: Arc<Mutex<String>>,
    pub health_ok: Arc<AtomicBool>,
    pub health_probes: Arc<AtomicU32>,
    pub fail_queries: Arc<AtomicBool>,
    /// Answer queries with HTTP 200 carrying a `status: error` envelope,
    /// the way the real proxy reports database errors.
    pub error_envelope: Arc<AtomicBool>,
}

impl StubProxy {
    fn new() -> Self {
        Self {
            queries: Arc::new(Mutex::new(Vec::new())),
            strategy: Arc::new(Mutex::new("direct".to_string())),
            health_ok: Arc::new(AtomicBool::new(true)),
            health_probes: Arc::new(AtomicU32::new(0)),
            fail_queries: Arc::new(AtomicBool::new(false)),
            error_envelope: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn recorded_queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().unwrap().clone()
    }

    pub fn probes(&self) -> u32 {
        self.health_probes.load(Ordering::SeqCst)
    }
}

async fn stub_health(State(stub): State<StubProxy>) -> Response {
    stub.health_probes.fetch_add(1, Ordering::SeqCst);
    if stub.health_ok.load(Ordering::SeqCst) {
        Json(HealthReport {
            status: "ok".to_string(),
            uptime: 1.0,
            current_strategy: Strategy::Direct,
            current_port: 3306,
            circuit_breaker_state: None,
            trusted_host_status: None,
            proxy_status: None,
        })
        .into_response()
    } else {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

async fn stub_set_strategy(State(stub): State<StubProxy>, Path(name): Path<String>) -> Response {
    match name.parse::<Strategy>() {
        Ok(strategy) => {
            *stub.strategy.lock().unwrap() = name;
            Json(ApiResponse::strategy_changed(strategy)).into_response()
        }
        Err(message) => {
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message))).into_response()
        }
    }
}

async fn stub_query(State(stub): State<StubProxy>, Json(request): Json<QueryRequest>) -> Response {
    stub.queries.lock().unwrap().push(request);
    if stub.error_envelope.load(Ordering::SeqCst) {
        return Json(ApiResponse::error("MySQL Error: Table 'missing' doesn't exist"))
            .into_response();
    }
    if stub.fail_queries.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("boom")),
        )
            .into_response();
    }
    let rows = serde_json::json!([
        {"actor_id": 1, "first_name": "PENELOPE", "last_name": "GUINESS"}
    ]);
    Json(ApiResponse::success(Some(rows))).into_response()
}

/// Start a stub Proxy honoring the real JSON contract.
pub async fn start_stub_proxy() -> (SocketAddr, StubProxy) {
    let stub = StubProxy::new();
    let app = Router::new()
        .route("/health", get(stub_health))
        .route("/set_strategy/{strategy}", get(stub_set_strategy))
        .route("/query", post(stub_query))
        .with_state(stub.clone());
    let addr = spawn_router(app).await;
    (addr, stub)
}

/// Start a real Trusted Host tier from config.
pub async fn start_trusted_host(config: &GatewayConfig) -> SocketAddr {
    let state = Arc::new(trusted_host::TrustedHost::new(config));
    spawn_router(trusted_host::router(state)).await
}

/// Start a real Gatekeeper tier from config.
pub async fn start_gatekeeper(config: &GatewayConfig) -> SocketAddr {
    let state = Arc::new(gatekeeper::Gatekeeper::new(config));
    spawn_router(gatekeeper::router(state)).await
}

async fn spawn_router(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// Config with fast retries and short timeouts for tests.
pub fn fast_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.retries.delay_ms = 10;
    config.timeouts.forward_secs = 5;
    config.timeouts.probe_secs = 2;
    config
}
