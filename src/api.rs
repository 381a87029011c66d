//! JSON wire contract shared by all three tiers.
//!
//! # Data Flow
//! ```text
//! client → Gatekeeper  POST /query {"query": ...}
//!        → TrustedHost POST /query {"query", "strategy", "port"}
//!        → Proxy       POST /query {"query", "strategy", "port"}
//!        ← {"status":"success","result":[...]} | {"status":"error","message":...}
//! ```
//!
//! # Design Decisions
//! - Tagged success/error variants; every response carries `status`
//! - Unknown optional fields deserialize as `None` so the envelope passes
//!   through tiers verbatim

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::strategy::Strategy;

/// A query request as it travels down the chain. The Gatekeeper attaches
/// `strategy` and `port`; the Trusted Host recomputes `port` from
/// `strategy` rather than trusting the inbound value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            strategy: None,
            port: None,
        }
    }
}

/// Response envelope returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse {
    Success {
        /// Row set for reads, explicit JSON null for writes. Absent only
        /// on strategy-change envelopes, hence the three-state mapping:
        /// `None` = no field, `Some(Value::Null)` = `"result": null`.
        #[serde(
            default,
            deserialize_with = "present_value",
            skip_serializing_if = "Option::is_none"
        )]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strategy: Option<Strategy>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<u16>,
    },
    Error {
        message: String,
    },
}

/// Keeps `"result": null` distinguishable from an absent field: a present
/// key always deserializes to `Some`, even when its value is null.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ApiResponse {
    /// Successful query outcome. Writes have no row set and serialize an
    /// explicit `"result": null`.
    pub fn success(result: Option<Value>) -> Self {
        ApiResponse::Success {
            result: Some(result.unwrap_or(Value::Null)),
            strategy: None,
            port: None,
        }
    }

    /// Successful strategy change, echoing the strategy and its port.
    pub fn strategy_changed(strategy: Strategy) -> Self {
        ApiResponse::Success {
            result: None,
            strategy: Some(strategy),
            port: Some(strategy.port()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }
}

/// `GET /health` report. Each tier fills the nested probe field that
/// applies to it and omits the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    /// Seconds since process start.
    pub uptime: f64,
    pub current_strategy: Strategy,
    pub current_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_breaker_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_host_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::error("nope")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "nope");
    }

    #[test]
    fn test_strategy_change_envelope() {
        let json = serde_json::to_value(ApiResponse::strategy_changed(Strategy::Random)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["strategy"], "random");
        assert_eq!(json["port"], 3307);
        assert!(
            json.get("result").is_none(),
            "strategy envelopes carry no result field"
        );
    }

    #[test]
    fn test_write_success_envelope_keeps_null_result() {
        let json = serde_json::to_value(ApiResponse::success(None)).unwrap();
        assert_eq!(json["status"], "success");
        assert!(
            json.as_object().unwrap().contains_key("result"),
            "query envelopes always carry a result field: {}",
            json
        );
        assert_eq!(json["result"], Value::Null);
    }

    #[test]
    fn test_null_result_survives_a_relay_hop() {
        let wire = r#"{"status":"success","result":null}"#;
        let envelope: ApiResponse = serde_json::from_str(wire).unwrap();
        let out = serde_json::to_value(&envelope).unwrap();
        assert!(out.as_object().unwrap().contains_key("result"), "{}", out);
        assert_eq!(out["result"], Value::Null);
    }

    #[test]
    fn test_envelope_passes_through_untouched() {
        // A success envelope produced by the proxy must survive a
        // serialize/deserialize hop at each relay tier.
        let rows = serde_json::json!([{"actor_id": 1, "first_name": "PENELOPE"}]);
        let resp = ApiResponse::success(Some(rows.clone()));
        let wire = serde_json::to_string(&resp).unwrap();
        let back: ApiResponse = serde_json::from_str(&wire).unwrap();
        match back {
            ApiResponse::Success { result, .. } => assert_eq!(result.unwrap(), rows),
            _ => panic!("expected success"),
        }
    }
}
