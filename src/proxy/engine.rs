//! Strategy-based routing over the database cluster.
//!
//! # Responsibilities
//! - Classify queries as reads or writes
//! - Pick the read target per the active strategy
//! - Execute writes on the manager and fan them out to every worker
//!
//! # Design Decisions
//! - Write classification is substring-based and deliberately looser than
//!   the Gatekeeper's whole-word validator: a second, independent line of
//!   defense
//! - Replication is best-effort and sequential; replica failures are
//!   logged and swallowed, the client sees the manager's outcome
//! - Customized strategy probes connect latency per request; a failed
//!   probe counts as infinite latency

use rand::Rng;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

use crate::api::ApiResponse;
use crate::observability::metrics;
use crate::proxy::executor::QueryExecutor;
use crate::strategy::Strategy;

/// Markers that classify a statement as a write, matched as substrings of
/// the upper-cased query.
const WRITE_MARKERS: &[&str] = &["INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER"];

/// Port used when the strategy does not dictate one: manager writes and
/// replication always go through the default access path.
const DEFAULT_PORT: u16 = 3306;

/// The replicated cluster: one write-authoritative manager and an
/// ordered, fixed set of read workers. Immutable after startup.
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    pub manager: String,
    pub workers: Vec<String>,
}

/// True if the query contains any write marker.
pub fn is_write_query(query: &str) -> bool {
    let upper = query.to_uppercase();
    WRITE_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Executes queries against cluster members per the active strategy.
pub struct RoutingEngine {
    topology: ClusterTopology,
    executor: Arc<dyn QueryExecutor>,
    strategy: RwLock<Strategy>,
    probe_timeout: Duration,
}

impl RoutingEngine {
    pub fn new(
        topology: ClusterTopology,
        executor: Arc<dyn QueryExecutor>,
        probe_timeout: Duration,
    ) -> Self {
        tracing::info!(
            manager = %topology.manager,
            workers = ?topology.workers,
            "Routing engine initialized"
        );
        Self {
            topology,
            executor,
            strategy: RwLock::new(Strategy::Direct),
            probe_timeout,
        }
    }

    pub fn strategy(&self) -> Strategy {
        *self.strategy.read().expect("strategy lock poisoned")
    }

    /// Last-write-wins; no request-scoped isolation.
    pub fn set_strategy(&self, strategy: Strategy) {
        *self.strategy.write().expect("strategy lock poisoned") = strategy;
        tracing::info!(strategy = %strategy, port = strategy.port(), "Strategy set");
    }

    /// Route one query to the right cluster member(s) and produce the
    /// client-visible envelope.
    pub async fn route(&self, query: &str) -> ApiResponse {
        if is_write_query(query) {
            self.route_write(query).await
        } else {
            self.route_read(query).await
        }
    }

    async fn route_write(&self, query: &str) -> ApiResponse {
        metrics::record_query("write");
        tracing::info!("Write operation detected, routing to manager");
        match self
            .executor
            .execute(&self.topology.manager, DEFAULT_PORT, query, true)
            .await
        {
            Ok(result) => {
                self.replicate_to_workers(query).await;
                ApiResponse::success(result)
            }
            Err(err) => ApiResponse::error(err.to_string()),
        }
    }

    async fn route_read(&self, query: &str) -> ApiResponse {
        metrics::record_query("read");
        let strategy = self.strategy();
        let target = self.select_read_host(strategy).await;
        tracing::info!(target = %target, strategy = %strategy, "Read operation routed");

        match self
            .executor
            .execute(&target, strategy.port(), query, false)
            .await
        {
            Ok(result) => ApiResponse::success(result),
            Err(err) if target != self.topology.manager => {
                // Last resort: one retry against the manager.
                tracing::warn!(worker = %target, error = %err, "Worker failed, falling back to manager");
                match self
                    .executor
                    .execute(&self.topology.manager, DEFAULT_PORT, query, false)
                    .await
                {
                    Ok(result) => ApiResponse::success(result),
                    Err(err) => ApiResponse::error(err.to_string()),
                }
            }
            Err(err) => ApiResponse::error(err.to_string()),
        }
    }

    /// Best-effort sequential fan-out of a write to every worker. The
    /// client-visible result is already decided by the manager.
    async fn replicate_to_workers(&self, query: &str) {
        for worker in &self.topology.workers {
            tracing::info!(worker = %worker, "Replicating write");
            if let Err(err) = self
                .executor
                .execute(worker, DEFAULT_PORT, query, true)
                .await
            {
                tracing::error!(worker = %worker, error = %err, "Failed to replicate write");
                metrics::record_replication_failure();
            }
        }
    }

    /// Pick the read target for the given strategy.
    pub async fn select_read_host(&self, strategy: Strategy) -> String {
        let workers = &self.topology.workers;
        match strategy {
            Strategy::Direct => workers[0].clone(),
            Strategy::Random => {
                let idx = rand::thread_rng().gen_range(0..workers.len());
                workers[idx].clone()
            }
            Strategy::Customized => self.fastest_worker().await,
        }
    }

    /// Probe every worker's connect latency and pick the minimum. Ties go
    /// to the earlier-configured worker; if every probe fails, fall back
    /// to the first worker.
    async fn fastest_worker(&self) -> String {
        let port = Strategy::Customized.port();
        let mut latencies = Vec::with_capacity(self.topology.workers.len());
        for worker in &self.topology.workers {
            let latency = probe_connect_latency(worker, port, self.probe_timeout).await;
            tracing::debug!(worker = %worker, latency = ?latency, "Latency probe");
            latencies.push(latency);
        }

        if latencies.iter().all(Option::is_none) {
            tracing::warn!("No responsive workers found, using first worker");
        }
        self.topology.workers[pick_fastest(&latencies)].clone()
    }
}

/// Index of the lowest measured latency; `None` counts as infinite. All
/// `None` falls back to index 0.
pub(crate) fn pick_fastest(latencies: &[Option<Duration>]) -> usize {
    let mut best: Option<(usize, Duration)> = None;
    for (idx, latency) in latencies.iter().enumerate() {
        if let Some(latency) = latency {
            if best.map_or(true, |(_, b)| *latency < b) {
                best = Some((idx, *latency));
            }
        }
    }
    best.map(|(idx, _)| idx).unwrap_or(0)
}

/// Wall-clock time to open a TCP connection, or `None` on failure.
pub(crate) async fn probe_connect_latency(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Option<Duration> {
    let start = Instant::now();
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => Some(start.elapsed()),
        _ => None,
    }
}
