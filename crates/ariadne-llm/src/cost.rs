//! Token usage and cost accounting for LLM calls.

use std::collections::HashMap;
use std::sync::Mutex;

/// Cost per 1K tokens (input + output combined) by model. Unknown models
/// fall back to a conservative default.
const MODEL_COSTS: [(&str, f64); 7] = [
    ("gpt-4o", 0.005),
    ("gpt-4o-mini", 0.00015),
    ("gpt-4-turbo", 0.01),
    ("gpt-3.5-turbo", 0.001),
    ("deepseek-chat", 0.0001),
    ("deepseek-coder", 0.0001),
    ("ollama", 0.0),
];

const DEFAULT_COST_PER_1K: f64 = 0.001;

#[derive(Debug, Clone, Default)]
struct ModelUsage {
    tokens: u64,
    cost: f64,
    requests: u64,
}

#[derive(Debug, Clone, Default)]
struct Usage {
    total_tokens: u64,
    total_cost_usd: f64,
    requests_count: u64,
    cached_count: u64,
    by_model: HashMap<String, ModelUsage>,
}

/// Thread-safe accumulator of per-model token counts and cost estimates.
#[derive(Default)]
pub struct CostTracker {
    usage: Mutex<Usage>,
}

/// Snapshot of accumulated usage.
#[derive(Debug, Clone, Default)]
pub struct CostSummary {
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub requests_count: u64,
    pub cached_count: u64,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one API request's token usage.
    pub fn record_request(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        cached: bool,
    ) {
        let total_tokens = input_tokens + output_tokens;
        let cost = total_tokens as f64 / 1000.0 * cost_per_1k(model);

        let mut usage = self.usage.lock().expect("cost tracker lock poisoned");
        usage.total_tokens += total_tokens;
        usage.total_cost_usd += cost;
        usage.requests_count += 1;
        if cached {
            usage.cached_count += 1;
        }

        let entry = usage.by_model.entry(model.to_string()).or_default();
        entry.tokens += total_tokens;
        entry.cost += cost;
        entry.requests += 1;
    }

    /// Formatted usage report.
    pub fn report(&self) -> String {
        let usage = self.usage.lock().expect("cost tracker lock poisoned");
        let mut lines = vec![
            "LLM Usage Report:".to_string(),
            format!("  Total Requests: {}", usage.requests_count),
            format!("  Cached: {}", usage.cached_count),
            format!("  Total Tokens: {}", usage.total_tokens),
            format!("  Total Cost: ${:.4}", usage.total_cost_usd),
        ];
        if !usage.by_model.is_empty() {
            lines.push("  By Model:".to_string());
            let mut models: Vec<_> = usage.by_model.iter().collect();
            models.sort_by(|a, b| a.0.cmp(b.0));
            for (model, stats) in models {
                lines.push(format!(
                    "    {model}: {} requests, {} tokens, ${:.4}",
                    stats.requests, stats.tokens, stats.cost
                ));
            }
        }
        lines.join("\n")
    }

    /// Numeric snapshot.
    pub fn summary(&self) -> CostSummary {
        let usage = self.usage.lock().expect("cost tracker lock poisoned");
        CostSummary {
            total_tokens: usage.total_tokens,
            total_cost_usd: usage.total_cost_usd,
            requests_count: usage.requests_count,
            cached_count: usage.cached_count,
        }
    }

    pub fn reset(&self) {
        *self.usage.lock().expect("cost tracker lock poisoned") = Usage::default();
    }
}

fn cost_per_1k(model: &str) -> f64 {
    for (known, cost) in MODEL_COSTS {
        if model == known {
            return cost;
        }
    }
    DEFAULT_COST_PER_1K
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate() {
        let tracker = CostTracker::new();
        tracker.record_request("gpt-4o-mini", 1000, 500, false);
        tracker.record_request("gpt-4o-mini", 2000, 500, true);

        let summary = tracker.summary();
        assert_eq!(summary.total_tokens, 4000);
        assert_eq!(summary.requests_count, 2);
        assert_eq!(summary.cached_count, 1);
        assert!(summary.total_cost_usd > 0.0);
    }

    #[test]
    fn ollama_is_free() {
        let tracker = CostTracker::new();
        tracker.record_request("ollama", 10_000, 10_000, false);
        assert_eq!(tracker.summary().total_cost_usd, 0.0);
    }

    #[test]
    fn report_lists_models() {
        let tracker = CostTracker::new();
        tracker.record_request("deepseek-chat", 100, 100, false);
        let report = tracker.report();
        assert!(report.contains("deepseek-chat"));
        assert!(report.contains("Total Requests: 1"));
    }
}
