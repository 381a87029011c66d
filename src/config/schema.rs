//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from config
//! files, and every field has a default so a minimal config is valid.

use serde::{Deserialize, Serialize};

/// Root configuration covering all three tiers. A process only reads the
/// sections for the tier it runs, plus the shared sections.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Perimeter service settings.
    pub gatekeeper: GatekeeperConfig,

    /// Internal relay settings.
    pub trusted_host: TrustedHostConfig,

    /// Routing engine settings, including cluster topology.
    pub proxy: ProxyTierConfig,

    /// Hop timeouts.
    pub timeouts: TimeoutConfig,

    /// Forwarding retry policy.
    pub retries: RetryConfig,

    /// Circuit breaker thresholds.
    pub breaker: BreakerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Gatekeeper perimeter service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Bind address for the public listener.
    pub bind_address: String,

    /// Base URL of the Trusted Host internal API.
    pub trusted_host_url: String,

    /// Requests allowed per client per window.
    pub rate_limit: usize,

    /// Sliding window length in seconds.
    pub rate_window_secs: u64,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            trusted_host_url: "http://127.0.0.1:5001".to_string(),
            rate_limit: 1000,
            rate_window_secs: 60,
        }
    }
}

/// Trusted Host relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrustedHostConfig {
    /// Bind address for the internal listener.
    pub bind_address: String,

    /// Base URL of the Proxy API.
    pub proxy_url: String,

    /// Requests allowed per client per window. Higher than the
    /// Gatekeeper's because multiple perimeter instances may share one
    /// relay.
    pub rate_limit: usize,

    /// Sliding window length in seconds.
    pub rate_window_secs: u64,

    /// Minimum seconds between cached proxy health probes.
    pub health_probe_interval_secs: u64,
}

impl Default for TrustedHostConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5001".to_string(),
            proxy_url: "http://127.0.0.1:5002".to_string(),
            rate_limit: 2000,
            rate_window_secs: 60,
            health_probe_interval_secs: 60,
        }
    }
}

/// Proxy routing engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyTierConfig {
    /// Bind address for the proxy listener.
    pub bind_address: String,

    /// Write-authoritative database node.
    pub manager_host: String,

    /// Ordered read replicas. Fixed at startup.
    pub worker_hosts: Vec<String>,

    /// MySQL credentials.
    pub mysql_user: String,
    pub mysql_password: String,

    /// Database to execute queries against.
    pub database: String,

    /// Connection establishment timeout in seconds, also used for the
    /// customized-strategy latency probes.
    pub connect_timeout_secs: u64,
}

impl Default for ProxyTierConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5002".to_string(),
            manager_host: "127.0.0.1".to_string(),
            worker_hosts: vec!["127.0.0.1".to_string()],
            mysql_user: "root".to_string(),
            mysql_password: String::new(),
            database: "sakila".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// Timeouts for cross-tier calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Query/strategy forwarding timeout in seconds.
    pub forward_secs: u64,

    /// Health probe timeout in seconds.
    pub probe_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            forward_secs: 30,
            probe_secs: 5,
        }
    }
}

/// Retry policy for forwarded operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per forwarded operation, including the first.
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub threshold: u32,

    /// Seconds the breaker stays open before probing again.
    pub timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            timeout_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
