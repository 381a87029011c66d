//! End-to-end tests for the Gatekeeper → Trusted Host → Proxy chain,
//! with the Proxy tier replaced by a programmable stub honoring the
//! real JSON contract.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;

use db_gateway::api::ApiResponse;
use db_gateway::config::GatewayConfig;

mod common;
use common::StubProxy;

/// Spin up stub proxy + real trusted host + real gatekeeper.
async fn full_chain(mut config: GatewayConfig) -> (String, SocketAddr, StubProxy) {
    let (proxy_addr, stub) = common::start_stub_proxy().await;
    config.trusted_host.proxy_url = format!("http://{}", proxy_addr);

    let th_addr = common::start_trusted_host(&config).await;
    config.gatekeeper.trusted_host_url = format!("http://{}", th_addr);

    let gk_addr = common::start_gatekeeper(&config).await;
    (format!("http://{}", gk_addr), th_addr, stub)
}

#[tokio::test]
async fn test_select_passes_through_the_chain() {
    let (gateway, _, stub) = full_chain(common::fast_config()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/query", gateway))
        .json(&serde_json::json!({"query": "SELECT * FROM actor WHERE actor_id = 1"}))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    let rows = body["result"].as_array().expect("result must be rows");
    assert!(!rows.is_empty());
    for row in rows {
        assert!(row.get("actor_id").is_some(), "each row carries actor_id");
    }

    // The gatekeeper attached its cached strategy; the trusted host
    // recomputed the matching port.
    let seen = stub.recorded_queries();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].strategy.unwrap().as_str(), "direct");
    assert_eq!(seen[0].port, Some(3306));
}

#[tokio::test]
async fn test_drop_is_rejected_at_the_gatekeeper() {
    let (gateway, _, stub) = full_chain(common::fast_config()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/query", gateway))
        .json(&serde_json::json!({"query": "DROP TABLE actor"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: ApiResponse = resp.json().await.unwrap();
    match body {
        ApiResponse::Error { message } => assert!(message.contains("DROP"), "{}", message),
        _ => panic!("expected an error envelope"),
    }

    assert!(
        stub.recorded_queries().is_empty(),
        "a rejected query must never reach the proxy tier"
    );
}

#[tokio::test]
async fn test_strategy_change_propagates_to_the_proxy() {
    let (gateway, _, stub) = full_chain(common::fast_config()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/set_strategy/random", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["strategy"], "random");
    assert_eq!(body["port"], 3307);

    assert_eq!(*stub.strategy.lock().unwrap(), "random");

    // The gatekeeper caches the new strategy for its own reporting.
    let health: serde_json::Value = client
        .get(format!("{}/health", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["current_strategy"], "random");
    assert_eq!(health["current_port"], 3307);
}

#[tokio::test]
async fn test_invalid_strategy_rejected_without_forwarding() {
    let (gateway, _, stub) = full_chain(common::fast_config()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/set_strategy/round-robin", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(*stub.strategy.lock().unwrap(), "direct");
}

#[tokio::test]
async fn test_rate_limit_rejects_request_over_budget() {
    let mut config = common::fast_config();
    config.gatekeeper.rate_limit = 3;
    let (gateway, _, _) = full_chain(config).await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let resp = client
            .post(format!("{}/query", gateway))
            .json(&serde_json::json!({"query": "SELECT 1"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = client
        .post(format!("{}/query", gateway))
        .json(&serde_json::json!({"query": "SELECT 1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 429);

    let body: ApiResponse = resp.json().await.unwrap();
    assert_eq!(body, ApiResponse::error("Rate limit exceeded"));
}

#[tokio::test]
async fn test_breaker_opens_after_sustained_failure() {
    // Point the gatekeeper at a port that refuses connections.
    let dead = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let mut config = common::fast_config();
    config.gatekeeper.trusted_host_url = format!("http://{}", dead_addr);
    config.retries.max_attempts = 1;
    config.breaker.threshold = 2;

    let gk_addr = common::start_gatekeeper(&config).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/query", gk_addr);
    let payload = serde_json::json!({"query": "SELECT 1"});

    for _ in 0..2 {
        let resp = client.post(&url).json(&payload).send().await.unwrap();
        assert_eq!(resp.status(), 502, "forward failures surface as gateway errors");
    }

    // Third request fails fast on the open breaker.
    let resp = client.post(&url).json(&payload).send().await.unwrap();
    assert_eq!(resp.status(), 503);
    let body: ApiResponse = resp.json().await.unwrap();
    assert_eq!(body, ApiResponse::error("Service temporarily unavailable"));
}

#[tokio::test]
async fn test_trusted_host_recomputes_port_from_strategy() {
    let mut config = common::fast_config();
    let (proxy_addr, stub) = common::start_stub_proxy().await;
    config.trusted_host.proxy_url = format!("http://{}", proxy_addr);
    let th_addr = common::start_trusted_host(&config).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/query", th_addr))
        .json(&serde_json::json!({
            "query": "SELECT 1",
            "strategy": "random",
            "port": 9999
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let seen = stub.recorded_queries();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].port, Some(3307), "inbound port must be ignored");
}

#[tokio::test]
async fn test_health_gate_short_circuits_and_caches() {
    let mut config = common::fast_config();
    let (proxy_addr, stub) = common::start_stub_proxy().await;
    stub.health_ok.store(false, Ordering::SeqCst);
    config.trusted_host.proxy_url = format!("http://{}", proxy_addr);
    let th_addr = common::start_trusted_host(&config).await;

    let client = reqwest::Client::new();
    let url = format!("http://{}/query", th_addr);
    let payload = serde_json::json!({"query": "SELECT 1"});

    let resp = client.post(&url).json(&payload).send().await.unwrap();
    assert_eq!(resp.status(), 503);
    let body: ApiResponse = resp.json().await.unwrap();
    assert_eq!(body, ApiResponse::error("Proxy service unavailable"));
    assert!(stub.recorded_queries().is_empty());
    assert_eq!(stub.probes(), 1);

    // Within the probe interval the cached observation is reused: no new
    // probe, same short-circuit.
    let resp = client.post(&url).json(&payload).send().await.unwrap();
    assert_eq!(resp.status(), 503);
    assert_eq!(stub.probes(), 1, "probe must be cached within the interval");
}

#[tokio::test]
async fn test_downstream_500_is_retried_then_masked() {
    let (gateway, _, stub) = full_chain(common::fast_config()).await;
    stub.fail_queries.store(true, Ordering::SeqCst);
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/query", gateway))
        .json(&serde_json::json!({"query": "SELECT 1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);

    let body: ApiResponse = resp.json().await.unwrap();
    assert_eq!(
        body,
        ApiResponse::error("Internal server error"),
        "downstream status detail must not leak to the client"
    );

    // Each tier spends its full attempt budget: 3 gatekeeper attempts,
    // each driving 3 trusted-host attempts against the proxy.
    assert_eq!(stub.recorded_queries().len(), 9);
}

#[tokio::test]
async fn test_proxy_error_envelope_passes_through_verbatim() {
    // A 200 envelope with status=error is the proxy's way of reporting a
    // database error; it must reach the client unchanged and must not be
    // retried by the relay tiers.
    let (gateway, _, stub) = full_chain(common::fast_config()).await;
    stub.error_envelope.store(true, Ordering::SeqCst);
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/query", gateway))
        .json(&serde_json::json!({"query": "SELECT 1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: ApiResponse = resp.json().await.unwrap();
    assert_eq!(
        body,
        ApiResponse::error("MySQL Error: Table 'missing' doesn't exist")
    );
    assert_eq!(stub.recorded_queries().len(), 1, "no retries on a 200 envelope");
}
