//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed down, requests fail fast
//! - Half-Open: testing if the upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count reaches threshold
//! Open → Half-Open: evaluated lazily in can_execute once the timeout
//!                   since the last failure has elapsed
//! Half-Open → Closed: a probe call succeeds (record_success)
//! Half-Open → Open: a probe call fails past the threshold again
//! ```
//!
//! # Design Decisions
//! - One instance per monitored upstream dependency
//! - Optimistic half-open: no single-flight gate, several concurrent
//!   callers may probe; repeated failure re-increments the counter
//! - Interior mutability so one breaker is shared across handler tasks

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        })
    }
}

struct Inner {
    failures: u32,
    last_failure: Option<Instant>,
    state: BreakerState,
}

/// Local failure-tracking state machine with hysteresis.
pub struct CircuitBreaker {
    threshold: u32,
    timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, timeout: Duration) -> Self {
        Self {
            threshold,
            timeout,
            inner: Mutex::new(Inner {
                failures: 0,
                last_failure: None,
                state: BreakerState::Closed,
            }),
        }
    }

    /// Whether a call may proceed. False only while strictly open with an
    /// unexpired timeout; crossing the timeout flips to half-open.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        if inner.state != BreakerState::Open {
            return true;
        }
        let expired = inner
            .last_failure
            .map(|t| t.elapsed() > self.timeout)
            .unwrap_or(true);
        if expired {
            tracing::info!("Circuit breaker entering half-open state");
            inner.state = BreakerState::HalfOpen;
            return true;
        }
        false
    }

    /// Record a successful call: any state collapses to closed and the
    /// failure count resets.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        if inner.state != BreakerState::Closed {
            tracing::info!(state = %inner.state, "Circuit breaker closing");
        }
        inner.failures = 0;
        inner.state = BreakerState::Closed;
    }

    /// Record a failed call, opening the breaker at the threshold.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        inner.failures += 1;
        inner.last_failure = Some(Instant::now());
        if inner.failures >= self.threshold {
            if inner.state != BreakerState::Open {
                tracing::warn!(failures = inner.failures, "Circuit breaker opened");
            }
            inner.state = BreakerState::Open;
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().expect("breaker mutex poisoned").state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().expect("breaker mutex poisoned").failures
    }
}
