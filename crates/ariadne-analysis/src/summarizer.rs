//! Bounded-concurrency fan-out of LLM summarization calls.
//!
//! A fixed pool of worker threads drains a crossbeam channel of items; a
//! single failing item never cancels its peers — it is replaced by a
//! deterministic fallback derived from the symbol itself. Statistics are
//! kept under one lock so snapshots are internally consistent (`success`
//! is never derived by unlocked subtraction).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::bounded;
use tracing::{debug, info, warn};

use ariadne_core::models::Symbol;
use ariadne_llm::{SummaryContext, SummaryProvider};

/// Statistics of the last batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummarizerStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// One work item: a symbol and its current source text.
#[derive(Debug, Clone)]
pub struct SummarizeItem {
    pub symbol: Symbol,
    pub source_code: String,
}

pub struct ParallelSummarizer {
    provider: Arc<dyn SummaryProvider>,
    max_workers: usize,
    stats: Arc<Mutex<SummarizerStats>>,
}

impl ParallelSummarizer {
    pub fn new(provider: Arc<dyn SummaryProvider>, max_workers: usize) -> Self {
        Self {
            provider,
            max_workers: max_workers.max(1),
            stats: Arc::new(Mutex::new(SummarizerStats::default())),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Summarize a batch with bounded concurrency.
    ///
    /// Returns one entry per item: the generated summary, or the fallback
    /// text when the provider failed for that item. The per-item timeout is
    /// the provider's own request timeout; worker threads are joined before
    /// returning, so cancellation of in-flight calls is best-effort (each
    /// worker finishes its current call).
    pub fn summarize_batch(&self, items: Vec<SummarizeItem>) -> HashMap<String, String> {
        if items.is_empty() {
            return HashMap::new();
        }

        {
            let mut stats = self.stats.lock().expect("summarizer stats lock poisoned");
            *stats = SummarizerStats {
                total: items.len(),
                ..Default::default()
            };
        }

        let worker_count = self.max_workers.min(items.len());
        let (work_tx, work_rx) = bounded::<SummarizeItem>(items.len());
        let (result_tx, result_rx) = bounded::<(String, String)>(items.len());

        for item in items {
            // Channel capacity equals the batch size, so sends cannot block.
            let _ = work_tx.send(item);
        }
        drop(work_tx);

        let mut handles = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let provider = Arc::clone(&self.provider);
            let stats = Arc::clone(&self.stats);

            let handle = thread::Builder::new()
                .name(format!("ariadne-summarizer-{worker}"))
                .spawn(move || {
                    while let Ok(item) = work_rx.recv() {
                        let context = context_for(&item.symbol);
                        let fqn = item.symbol.fqn.clone();

                        let text = match provider.generate_summary(&item.source_code, &context) {
                            Ok(summary) => {
                                let mut stats =
                                    stats.lock().expect("summarizer stats lock poisoned");
                                stats.success += 1;
                                summary
                            }
                            Err(e) => {
                                warn!(fqn = %fqn, error = %e, "Summarization failed, using fallback");
                                let mut stats =
                                    stats.lock().expect("summarizer stats lock poisoned");
                                stats.failed += 1;
                                drop(stats);
                                fallback_summary(&item.symbol)
                            }
                        };
                        let _ = result_tx.send((fqn, text));
                    }
                })
                .expect("failed to spawn summarizer worker");
            handles.push(handle);
        }
        drop(result_tx);

        let mut results = HashMap::new();
        while let Ok((fqn, text)) = result_rx.recv() {
            results.insert(fqn, text);
        }

        for handle in handles {
            let _ = handle.join();
        }

        let stats = self.stats();
        info!(
            total = stats.total,
            success = stats.success,
            failed = stats.failed,
            "Summarization batch complete"
        );
        results
    }

    /// Consistent snapshot of the last batch's statistics.
    pub fn stats(&self) -> SummarizerStats {
        *self.stats.lock().expect("summarizer stats lock poisoned")
    }

    pub fn reset_stats(&self) {
        *self.stats.lock().expect("summarizer stats lock poisoned") =
            SummarizerStats::default();
    }
}

fn context_for(symbol: &Symbol) -> SummaryContext {
    SummaryContext {
        class_name: symbol.parent_fqn.clone().unwrap_or_default(),
        method_name: symbol.name.clone(),
        signature: symbol.signature.clone().unwrap_or_default(),
        modifiers: symbol.modifiers.clone(),
        annotations: symbol.annotations.clone(),
    }
}

/// Deterministic fallback derived from the symbol itself. Getters,
/// setters, and static methods get stock phrases.
pub fn fallback_summary(symbol: &Symbol) -> String {
    let name = symbol.fqn.rsplit('.').next().unwrap_or(&symbol.name);
    let name = name.split('(').next().unwrap_or(name);

    let signature = symbol.signature.as_deref().unwrap_or("");
    if name.starts_with("get") || name.starts_with("is") || signature.to_lowercase().contains("return")
    {
        return "N/A (getter/accessor)".to_string();
    }
    if name.starts_with("set") {
        return "N/A (setter/mutator)".to_string();
    }
    if symbol.modifiers.iter().any(|m| m == "static") {
        return format!("Static method: {name}");
    }
    debug!(fqn = %symbol.fqn, "Generic fallback summary");
    format!("Method: {name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ariadne_core::models::SymbolKind;

    fn method(fqn: &str, name: &str) -> Symbol {
        Symbol::new(fqn, SymbolKind::Method, name)
    }

    #[test]
    fn fallback_classifies_accessors() {
        let mut getter = method("com.example.A.getName()", "getName");
        getter.signature = Some("()Ljava/lang/String;".into());
        assert_eq!(fallback_summary(&getter), "N/A (getter/accessor)");

        let setter = method("com.example.A.setName(String)", "setName");
        assert_eq!(fallback_summary(&setter), "N/A (setter/mutator)");
    }

    #[test]
    fn fallback_marks_static_methods() {
        let mut of = method("com.example.A.of(int)", "of");
        of.modifiers = vec!["public".into(), "static".into()];
        assert_eq!(fallback_summary(&of), "Static method: of");
    }

    #[test]
    fn fallback_default_is_method_name() {
        let process = method("com.example.A.process(Order)", "process");
        assert_eq!(fallback_summary(&process), "Method: process");
    }
}
