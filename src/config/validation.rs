//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check the cluster topology is usable (at least one worker)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a config.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, url) in [
        ("gatekeeper.trusted_host_url", &config.gatekeeper.trusted_host_url),
        ("trusted_host.proxy_url", &config.trusted_host.proxy_url),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(ValidationError {
                field,
                message: format!("'{}' is not an http(s) URL", url),
            });
        }
    }

    if config.proxy.worker_hosts.is_empty() {
        errors.push(ValidationError {
            field: "proxy.worker_hosts",
            message: "at least one worker host is required".to_string(),
        });
    }

    if config.proxy.manager_host.is_empty() {
        errors.push(ValidationError {
            field: "proxy.manager_host",
            message: "manager host must not be empty".to_string(),
        });
    }

    if config.gatekeeper.rate_limit == 0 {
        errors.push(ValidationError {
            field: "gatekeeper.rate_limit",
            message: "rate limit must be greater than zero".to_string(),
        });
    }

    if config.trusted_host.rate_limit == 0 {
        errors.push(ValidationError {
            field: "trusted_host.rate_limit",
            message: "rate limit must be greater than zero".to_string(),
        });
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError {
            field: "retries.max_attempts",
            message: "at least one attempt is required".to_string(),
        });
    }

    if config.breaker.threshold == 0 {
        errors.push(ValidationError {
            field: "breaker.threshold",
            message: "threshold must be greater than zero".to_string(),
        });
    }

    if config.timeouts.forward_secs == 0 || config.timeouts.probe_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts",
            message: "timeouts must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
