//! Read-routing strategies and their logical access ports.
//!
//! Each strategy maps to a distinct port on the data tier, modeling three
//! access paths over the same underlying cluster rather than three stores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the proxy selects a worker for read queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Always the first configured worker.
    #[default]
    Direct,
    /// Uniform random pick over workers.
    Random,
    /// Worker with the lowest measured connect latency.
    Customized,
}

impl Strategy {
    /// Logical data-tier port for this strategy.
    pub fn port(self) -> u16 {
        match self {
            Strategy::Direct => 3306,
            Strategy::Random => 3307,
            Strategy::Customized => 3308,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Random => "random",
            Strategy::Customized => "customized",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Strategy::Direct),
            "random" => Ok(Strategy::Random),
            "customized" => Ok(Strategy::Customized),
            other => Err(format!(
                "Invalid strategy '{}'. Must be one of: direct, random, customized",
                other
            )),
        }
    }
}
