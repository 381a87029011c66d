//! Perimeter security primitives.
//!
//! # Responsibilities
//! - Lexical SQL screening before any database-tier network call
//! - Per-client sliding-window admission control
//!
//! # Design Decisions
//! - The validator is pure and deterministic; it runs once, at the
//!   Gatekeeper, and downstream tiers trust its result
//! - Rate limiter state is per-process; each tier owns its own map

pub mod rate_limit;
pub mod validator;

pub use rate_limit::SlidingWindowLimiter;
pub use validator::QueryValidator;
