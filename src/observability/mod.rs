//! Logging and metrics wiring shared by all tiers.

pub mod logging;
pub mod metrics;
