//! End-to-end orchestration of one incremental summary update:
//! invalidate → load → filter → summarize → persist.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use ariadne_core::models::{Summary, SummaryLevel, Symbol};
use ariadne_core::AriadneResult;
use ariadne_llm::{CostTracker, SummaryProvider};
use ariadne_storage::{DualWriteCoordinator, GraphStore, VectorStore};

use crate::dependency_tracker::DependencyTracker;
use crate::summarizer::{ParallelSummarizer, SummarizeItem};

/// Result of one incremental regeneration pass.
#[derive(Debug, Clone, Default)]
pub struct IncrementalResult {
    pub regenerated_count: usize,
    pub skipped_cached: usize,
    pub duration_seconds: f64,
    pub cost_report: String,

    pub dependency_analysis_seconds: f64,
    pub symbol_load_seconds: f64,
    pub summarization_seconds: f64,
    pub database_update_seconds: f64,
    pub throughput_per_second: f64,

    pub changed: usize,
    pub dependents: usize,
    pub total_affected: usize,
    pub success: usize,
    pub failed: usize,
}

pub struct IncrementalCoordinator {
    store: Arc<GraphStore>,
    coordinator: DualWriteCoordinator,
    tracker: DependencyTracker,
    parallel: ParallelSummarizer,
    cost_tracker: CostTracker,
}

impl IncrementalCoordinator {
    pub fn new(
        store: Arc<GraphStore>,
        provider: Arc<dyn SummaryProvider>,
        max_workers: usize,
    ) -> Self {
        Self {
            coordinator: DualWriteCoordinator::new(Arc::clone(&store)),
            tracker: DependencyTracker::new(Arc::clone(&store)),
            parallel: ParallelSummarizer::new(provider, max_workers),
            cost_tracker: CostTracker::new(),
            store,
        }
    }

    /// Regenerate summaries for `changed_fqns` and their 1-hop dependents.
    ///
    /// `source_map` maps FQN to current source text; affected symbols
    /// without source text are skipped with a debug log. When a vector
    /// store is provided, persisted summaries go through the dual-write
    /// path (without embeddings here; embedding backfill is a separate
    /// concern of the search indexer).
    pub fn regenerate_incremental(
        &self,
        changed_fqns: &[String],
        source_map: &HashMap<String, String>,
        vector_store: Option<&VectorStore>,
    ) -> AriadneResult<IncrementalResult> {
        let started = Instant::now();

        info!(
            changed = changed_fqns.len(),
            max_workers = self.parallel.max_workers(),
            "Starting incremental update"
        );

        // Phase 1: dependency analysis (marks the affected set stale).
        let dep_started = Instant::now();
        let affected = self.tracker.get_affected_symbols(changed_fqns)?;
        let dependency_analysis_seconds = dep_started.elapsed().as_secs_f64();

        let mut result = IncrementalResult {
            changed: changed_fqns.len(),
            dependents: affected.dependents.len(),
            total_affected: affected.total(),
            dependency_analysis_seconds,
            ..Default::default()
        };

        if affected.total_set.is_empty() {
            result.duration_seconds = started.elapsed().as_secs_f64();
            result.cost_report = self.cost_tracker.report();
            info!("No symbols to process");
            return Ok(result);
        }

        // Phase 2: batch symbol load, one IN query over the affected set.
        let load_started = Instant::now();
        let affected_fqns: Vec<String> = affected.total_set.iter().cloned().collect();
        let records = self.store.get_symbols_by_fqns(&affected_fqns)?;

        let mut items: Vec<SummarizeItem> = Vec::new();
        for record in records {
            let fqn = record.symbol.fqn.clone();
            match source_map.get(&fqn) {
                Some(source) if !source.is_empty() => items.push(SummarizeItem {
                    symbol: record.symbol,
                    source_code: source.clone(),
                }),
                _ => {
                    debug!(fqn = %fqn, "No source code provided, skipping");
                }
            }
        }
        result.symbol_load_seconds = load_started.elapsed().as_secs_f64();

        if items.is_empty() {
            result.duration_seconds = started.elapsed().as_secs_f64();
            result.cost_report = self.cost_tracker.report();
            info!("No valid symbols with source code");
            return Ok(result);
        }

        // Phase 3: freshness filter. A summary already fresh means an
        // earlier overlapping update completed it; that is a cache hit.
        let item_fqns: Vec<String> = items.iter().map(|i| i.symbol.fqn.clone()).collect();
        let fresh: std::collections::HashSet<String> = self
            .store
            .get_staleness(&item_fqns)?
            .into_iter()
            .filter(|(_, is_stale)| !is_stale)
            .map(|(fqn, _)| fqn)
            .collect();

        let before = items.len();
        items.retain(|item| !fresh.contains(&item.symbol.fqn));
        result.skipped_cached = before - items.len();

        info!(
            to_process = items.len(),
            cached = result.skipped_cached,
            "Cache filter complete"
        );

        // Phase 4: bounded parallel fan-out.
        let symbols_by_fqn: HashMap<String, Symbol> = items
            .iter()
            .map(|i| (i.symbol.fqn.clone(), i.symbol.clone()))
            .collect();
        let sum_started = Instant::now();
        let summaries = self.parallel.summarize_batch(items);
        result.summarization_seconds = sum_started.elapsed().as_secs_f64();

        // Phase 5: batch persist. Re-check staleness in one lookup first;
        // a row freshened by a concurrent update is skipped rather than
        // overwritten (last-writer-wins is avoided).
        let db_started = Instant::now();
        let produced_fqns: Vec<String> = summaries.keys().cloned().collect();
        let now_fresh: std::collections::HashSet<String> = self
            .store
            .get_staleness(&produced_fqns)?
            .into_iter()
            .filter(|(_, is_stale)| !is_stale)
            .map(|(fqn, _)| fqn)
            .collect();

        for (fqn, text) in &summaries {
            if now_fresh.contains(fqn) {
                info!(fqn = %fqn, "Skipping persist - freshened by concurrent update");
                continue;
            }
            let Some(symbol) = symbols_by_fqn.get(fqn) else {
                continue;
            };
            let summary = Summary::fresh(fqn, SummaryLevel::for_kind(symbol.kind), text);

            match vector_store {
                Some(vs) => {
                    self.coordinator
                        .create_summary_with_vector(&summary, None, vs)?;
                }
                None => self.store.upsert_summary(&summary)?,
            }
            result.regenerated_count += 1;
        }
        result.database_update_seconds = db_started.elapsed().as_secs_f64();

        let stats = self.parallel.stats();
        result.success = stats.success;
        result.failed = stats.failed;
        result.duration_seconds = started.elapsed().as_secs_f64();
        result.throughput_per_second = if result.duration_seconds > 0.0 {
            result.regenerated_count as f64 / result.duration_seconds
        } else {
            0.0
        };
        result.cost_report = self.cost_tracker.report();

        info!(
            regenerated = result.regenerated_count,
            cached = result.skipped_cached,
            duration = result.duration_seconds,
            throughput = result.throughput_per_second,
            "Incremental update complete"
        );
        Ok(result)
    }

    pub fn cost_tracker(&self) -> &CostTracker {
        &self.cost_tracker
    }
}
