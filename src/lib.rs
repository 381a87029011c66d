//! Three-tier SQL request-routing gateway.
//!
//! ```text
//!                 ┌────────────┐      ┌──────────────┐      ┌───────────┐
//!  client ───────▶│ Gatekeeper │─────▶│ Trusted Host │─────▶│   Proxy   │
//!   POST /query   │  validate  │      │ health gate  │      │  strategy │
//!                 │ rate limit │      │   + retry    │      │  routing  │
//!                 └────────────┘      └──────────────┘      └─────┬─────┘
//!                                                                 │
//!                                                     ┌───────────┴───────────┐
//!                                                     ▼                       ▼
//!                                                 manager (writes)   workers (reads,
//!                                                   + replication     per strategy)
//! ```
//!
//! Only the Gatekeeper is meant to be externally reachable; the Trusted
//! Host and Proxy rely on network segmentation configured at deployment
//! time.

pub mod api;
pub mod config;
pub mod error;
pub mod gatekeeper;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod security;
pub mod strategy;
pub mod trusted_host;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use strategy::Strategy;
