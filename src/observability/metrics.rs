//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by tier and endpoint
//! - `gateway_rejected_total` (counter): perimeter rejections by reason
//! - `gateway_upstream_retries_total` (counter): retried forward attempts
//! - `proxy_queries_total` (counter): executed queries by kind
//! - `proxy_replication_failures_total` (counter): swallowed replica errors
//!
//! # Design Decisions
//! - Low-overhead updates via the `metrics` macros
//! - Exporter is optional; recording without it is a no-op

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on the given address. Must be called
/// from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(tier: &'static str, endpoint: &'static str) {
    counter!("gateway_requests_total", "tier" => tier, "endpoint" => endpoint).increment(1);
}

pub fn record_rejected(tier: &'static str, reason: &'static str) {
    counter!("gateway_rejected_total", "tier" => tier, "reason" => reason).increment(1);
}

pub fn record_retry(tier: &'static str) {
    counter!("gateway_upstream_retries_total", "tier" => tier).increment(1);
}

pub fn record_query(kind: &'static str) {
    counter!("proxy_queries_total", "kind" => kind).increment(1);
}

pub fn record_replication_failure() {
    counter!("proxy_replication_failures_total").increment(1);
}
