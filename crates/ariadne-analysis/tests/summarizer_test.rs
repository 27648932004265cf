//! Parallel summarizer: error isolation, fallback substitution, and
//! consistent statistics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ariadne_analysis::summarizer::{SummarizeItem, SummarizerStats};
use ariadne_analysis::ParallelSummarizer;
use ariadne_core::models::{Symbol, SymbolKind};
use ariadne_core::{AriadneError, AriadneResult};
use ariadne_llm::{SummaryContext, SummaryProvider};

/// Provider that fails whenever the source contains "boom".
struct FlakyProvider {
    calls: AtomicUsize,
}

impl SummaryProvider for FlakyProvider {
    fn generate_summary(&self, code: &str, context: &SummaryContext) -> AriadneResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if code.contains("boom") {
            return Err(AriadneError::Transient {
                attempts: 3,
                reason: "simulated provider outage".into(),
            });
        }
        Ok(format!("Handles {}", context.method_name))
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

fn item(fqn: &str, name: &str, code: &str) -> SummarizeItem {
    SummarizeItem {
        symbol: Symbol::new(fqn, SymbolKind::Method, name),
        source_code: code.to_string(),
    }
}

#[test]
fn failing_item_gets_fallback_peers_succeed() {
    let provider = Arc::new(FlakyProvider {
        calls: AtomicUsize::new(0),
    });
    let summarizer = ParallelSummarizer::new(provider.clone(), 4);

    let results = summarizer.summarize_batch(vec![
        item("com.example.A.one()", "one", "return 1;"),
        item("com.example.A.two()", "two", "return 2;"),
        item("com.example.A.three()", "three", "boom();"),
        item("com.example.A.four()", "four", "return 4;"),
    ]);

    // All four keys present; the failed item carries the fallback pattern.
    assert_eq!(results.len(), 4);
    assert_eq!(results["com.example.A.one()"], "Handles one");
    assert_eq!(results["com.example.A.two()"], "Handles two");
    assert_eq!(results["com.example.A.three()"], "Method: three");
    assert_eq!(results["com.example.A.four()"], "Handles four");

    assert_eq!(
        summarizer.stats(),
        SummarizerStats {
            total: 4,
            success: 3,
            failed: 1,
            skipped: 0,
        }
    );
    assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
}

#[test]
fn empty_batch_is_a_noop() {
    let provider = Arc::new(FlakyProvider {
        calls: AtomicUsize::new(0),
    });
    let summarizer = ParallelSummarizer::new(provider.clone(), 4);

    assert!(summarizer.summarize_batch(Vec::new()).is_empty());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn worker_count_larger_than_batch_is_fine() {
    let provider = Arc::new(FlakyProvider {
        calls: AtomicUsize::new(0),
    });
    let summarizer = ParallelSummarizer::new(provider, 16);

    let results = summarizer.summarize_batch(vec![item("com.example.A.only()", "only", "ok")]);
    assert_eq!(results.len(), 1);
    assert_eq!(summarizer.stats().success, 1);
}

#[test]
fn all_failures_still_produce_full_result_map() {
    let provider = Arc::new(FlakyProvider {
        calls: AtomicUsize::new(0),
    });
    let summarizer = ParallelSummarizer::new(provider, 2);

    let results = summarizer.summarize_batch(vec![
        item("com.example.A.x()", "x", "boom"),
        item("com.example.A.getValue()", "getValue", "boom"),
        item("com.example.A.setValue(int)", "setValue", "boom"),
    ]);

    assert_eq!(results.len(), 3);
    assert_eq!(results["com.example.A.x()"], "Method: x");
    // Fallbacks are heuristic per symbol shape.
    assert_eq!(results["com.example.A.getValue()"], "N/A (getter/accessor)");
    assert_eq!(results["com.example.A.setValue(int)"], "N/A (setter/mutator)");

    let stats = summarizer.stats();
    assert_eq!(stats.failed, 3);
    assert_eq!(stats.success, 0);
}
