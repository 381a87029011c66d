//! Per-client sliding-window rate limiting.
//!
//! # Responsibilities
//! - Track request timestamps per client inside a trailing window
//! - Prune expired entries lazily on every check
//! - Evict idle clients so the map stays bounded by active traffic
//!
//! # Design Decisions
//! - The window never retains entries older than its length after a
//!   check runs
//! - Eviction sweeps piggyback on checks at most once per window, so no
//!   background task is needed

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Windows {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

/// Sliding-window admission counter, one instance per tier process.
pub struct SlidingWindowLimiter {
    limit: usize,
    window: Duration,
    inner: Mutex<Windows>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            inner: Mutex::new(Windows {
                clients: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Record a request for `client_id` and report whether it is within
    /// the limit. The timestamp is recorded even when the check fails, so
    /// a client hammering past its limit keeps its window full.
    pub fn check(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("rate limiter mutex poisoned");

        if now.duration_since(inner.last_sweep) >= self.window {
            self.sweep(&mut inner, now);
        }

        let window = self.window;
        let timestamps = inner.clients.entry(client_id.to_string()).or_default();
        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
        timestamps.push_back(now);

        let allowed = timestamps.len() <= self.limit;
        if !allowed {
            tracing::warn!(client = %client_id, count = timestamps.len(), "Rate limit exceeded");
        }
        allowed
    }

    /// Drop clients whose newest entry fell out of the window.
    fn sweep(&self, inner: &mut Windows, now: Instant) {
        let window = self.window;
        inner
            .clients
            .retain(|_, ts| matches!(ts.back(), Some(t) if now.duration_since(*t) < window));
        inner.last_sweep = now;
    }

    /// Number of clients currently tracked. Test hook.
    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.inner.lock().unwrap().clients.len()
    }
}
