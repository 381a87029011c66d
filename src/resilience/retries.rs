//! Bounded retry policy for forwarded operations.
//!
//! # Responsibilities
//! - Run an async operation up to a fixed number of attempts
//! - Sleep a fixed delay between attempts without blocking the runtime
//!
//! # Design Decisions
//! - Fixed delay, no exponential growth: hops are internal and the
//!   attempt budget is small
//! - The caller decides what failure means; the policy only sequences
//!   attempts, so breakers record the terminal outcome exactly once

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds or the attempt budget is exhausted,
    /// returning the final error.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_if(op, |_| true).await
    }

    /// Like [`run`](Self::run), but gives up immediately on errors that
    /// `should_retry` classifies as terminal.
    pub async fn run_if<T, E, F, Fut, P>(&self, mut op: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !should_retry(&err) {
                        tracing::debug!(attempt, error = %err, "Terminal error, not retrying");
                        return Err(err);
                    }
                    tracing::warn!(attempt, error = %err, "Attempt failed");
                    if attempt >= self.max_attempts {
                        return Err(err);
                    }
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}
