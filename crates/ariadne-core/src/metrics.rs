//! In-process metrics accumulator.
//!
//! Components count events and record durations here; aggregation and
//! shipping are external concerns. The buffer is capped so an unscraped
//! process does not grow without bound.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const MAX_TRACKED_NAMES: usize = 1024;

#[derive(Debug, Clone, Default)]
struct DurationStats {
    count: u64,
    total: Duration,
    max: Duration,
}

/// Counter and duration accumulator keyed by event name.
#[derive(Default)]
pub struct MetricsCollector {
    counters: Mutex<HashMap<String, u64>>,
    durations: Mutex<HashMap<String, DurationStats>>,
}

/// Point-in-time snapshot of the collector.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    /// name → (count, total, max)
    pub durations: HashMap<String, (u64, Duration, Duration)>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a named counter by one.
    pub fn incr(&self, name: &str) {
        self.incr_by(name, 1);
    }

    /// Increment a named counter.
    pub fn incr_by(&self, name: &str, delta: u64) {
        let mut counters = self.counters.lock().expect("metrics lock poisoned");
        if counters.len() >= MAX_TRACKED_NAMES && !counters.contains_key(name) {
            return;
        }
        *counters.entry(name.to_string()).or_insert(0) += delta;
    }

    /// Record a duration sample for a named operation.
    pub fn observe(&self, name: &str, elapsed: Duration) {
        let mut durations = self.durations.lock().expect("metrics lock poisoned");
        if durations.len() >= MAX_TRACKED_NAMES && !durations.contains_key(name) {
            return;
        }
        let stats = durations.entry(name.to_string()).or_default();
        stats.count += 1;
        stats.total += elapsed;
        if elapsed > stats.max {
            stats.max = elapsed;
        }
    }

    /// Consistent snapshot of all counters and duration stats.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .lock()
            .expect("metrics lock poisoned")
            .clone();
        let durations = self
            .durations
            .lock()
            .expect("metrics lock poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), (v.count, v.total, v.max)))
            .collect();
        MetricsSnapshot { counters, durations }
    }

    /// Reset all accumulated values (shutdown / test isolation).
    pub fn reset(&self) {
        self.counters.lock().expect("metrics lock poisoned").clear();
        self.durations.lock().expect("metrics lock poisoned").clear();
    }
}
