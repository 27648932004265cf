//! Bounded sliding-window rate limiter.
//!
//! Per-client ordered timestamp lists guarded by a mutex, swept for
//! inactivity so idle clients do not accumulate forever.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Clients idle longer than this are dropped by `sweep`.
const INACTIVE_TTL: Duration = Duration::from_secs(3600);

/// Sliding-window rate limiter keyed by client identifier.
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request for `client` and decide whether it is allowed.
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().expect("rate limiter lock poisoned");
        let timestamps = clients.entry(client.to_string()).or_default();

        while let Some(&front) = timestamps.front() {
            if now.duration_since(front) > self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_requests {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Remaining allowance for `client` in the current window.
    pub fn remaining(&self, client: &str) -> usize {
        let clients = self.clients.lock().expect("rate limiter lock poisoned");
        let used = clients.get(client).map(|t| t.len()).unwrap_or(0);
        self.max_requests.saturating_sub(used)
    }

    /// Drop clients whose newest request is older than the inactivity TTL.
    /// Returns the number of clients removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut clients = self.clients.lock().expect("rate limiter lock poisoned");
        let before = clients.len();
        clients.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|&last| now.duration_since(last) < INACTIVE_TTL)
        });
        let removed = before - clients.len();
        if removed > 0 {
            tracing::debug!(removed, "Swept inactive rate-limit clients");
        }
        removed
    }

    /// Number of tracked clients.
    pub fn client_count(&self) -> usize {
        self.clients.lock().expect("rate limiter lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_blocks() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        assert!(limiter.check("client-a"));
        assert!(limiter.check("client-a"));
        assert!(limiter.check("client-a"));
        assert!(!limiter.check("client-a"));
        assert_eq!(limiter.remaining("client-a"), 0);
    }

    #[test]
    fn clients_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        assert!(!limiter.check("a"));
    }

    #[test]
    fn window_expiry_frees_slots() {
        let limiter = RateLimiter::new(Duration::from_millis(0), 1);
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0));
        // Zero-length window: the first timestamp is already expired.
        assert!(limiter.check_at("a", t0 + Duration::from_millis(5)));
    }

    #[test]
    fn sweep_keeps_active_clients() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 10);
        limiter.check("active");
        assert_eq!(limiter.sweep(), 0);
        assert_eq!(limiter.client_count(), 1);
    }
}
