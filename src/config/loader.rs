//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Failure to produce a usable gateway configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read gateway config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Gateway config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Gateway config rejected: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_parses_with_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [proxy]
            manager_host = "10.0.0.1"
            worker_hosts = ["10.0.0.2", "10.0.0.3"]
            "#,
        )
        .unwrap();

        assert_eq!(config.proxy.manager_host, "10.0.0.1");
        assert_eq!(config.proxy.worker_hosts.len(), 2);
        assert_eq!(config.gatekeeper.rate_limit, 1000);
        assert_eq!(config.trusted_host.rate_limit, 2000);
        assert_eq!(config.breaker.threshold, 5);
    }

    #[test]
    fn test_validation_error_names_the_offending_fields() {
        let mut config = GatewayConfig::default();
        config.proxy.worker_hosts.clear();
        config.gatekeeper.rate_limit = 0;

        let errors = validate_config(&config).unwrap_err();
        let text = ConfigError::Validation(errors).to_string();
        assert!(text.contains("proxy.worker_hosts"), "{}", text);
        assert!(text.contains("gatekeeper.rate_limit"), "{}", text);
    }
}
