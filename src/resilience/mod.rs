//! Failure handling primitives shared by the forwarding tiers.

pub mod circuit_breaker;
pub mod retries;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use retries::RetryPolicy;
