//! 1-hop reverse dependency tracking for incremental summarization.
//!
//! When a symbol changes, its direct callers and its containing parent need
//! their summaries re-examined. The closure is deliberately one hop:
//! transitively invalidating the whole reverse cone over-regenerates and
//! destroys cache value.

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::params_from_iter;
use tracing::info;

use ariadne_core::{AriadneError, AriadneResult};
use ariadne_storage::GraphStore;

/// Result of dependency analysis for a set of changed symbols.
#[derive(Debug, Clone, Default)]
pub struct AffectedSymbols {
    pub changed: Vec<String>,
    pub dependents: Vec<String>,
    pub total_set: HashSet<String>,
}

impl AffectedSymbols {
    fn new(changed: Vec<String>, dependents: HashSet<String>) -> Self {
        let mut total_set: HashSet<String> = changed.iter().cloned().collect();
        total_set.extend(dependents.iter().cloned());
        Self {
            changed,
            dependents: dependents.into_iter().collect(),
            total_set,
        }
    }

    pub fn total(&self) -> usize {
        self.total_set.len()
    }
}

pub struct DependencyTracker {
    store: Arc<GraphStore>,
}

impl DependencyTracker {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Compute the affected set for `changed_fqns` and mark every affected
    /// summary stale in the same logical operation — callers cannot forget
    /// the stale-marking because it is part of this contract.
    ///
    /// Two batched queries, no N+1: distinct callers over `calls` edges,
    /// then parent containers.
    pub fn get_affected_symbols(&self, changed_fqns: &[String]) -> AriadneResult<AffectedSymbols> {
        if changed_fqns.is_empty() {
            return Ok(AffectedSymbols::default());
        }

        let mut dependents: HashSet<String> = HashSet::new();

        // Query 1: direct callers of any changed symbol.
        let callers: Vec<String> = self
            .store
            .with_reader(|conn| {
                let sql = format!(
                    "SELECT DISTINCT from_fqn FROM edges
                     WHERE to_fqn IN ({}) AND relation = 'calls'",
                    placeholders(changed_fqns.len())
                );
                let mut stmt = conn.prepare(&sql).map_err(sqe)?;
                let rows = stmt
                    .query_map(params_from_iter(changed_fqns.iter()), |row| row.get(0))
                    .map_err(sqe)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(sqe)?);
                }
                Ok(out)
            })
            .map_err(AriadneError::Storage)?;
        dependents.extend(callers);

        // Query 2: parent containers of the changed symbols.
        let parents: Vec<Option<String>> = self
            .store
            .with_reader(|conn| {
                let sql = format!(
                    "SELECT parent_fqn FROM symbols WHERE fqn IN ({})",
                    placeholders(changed_fqns.len())
                );
                let mut stmt = conn.prepare(&sql).map_err(sqe)?;
                let rows = stmt
                    .query_map(params_from_iter(changed_fqns.iter()), |row| row.get(0))
                    .map_err(sqe)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(sqe)?);
                }
                Ok(out)
            })
            .map_err(AriadneError::Storage)?;
        dependents.extend(parents.into_iter().flatten());

        let affected = AffectedSymbols::new(changed_fqns.to_vec(), dependents);

        // Stale-marking is part of the tracker's contract: one statement
        // over the whole affected set.
        let to_mark: Vec<String> = affected.total_set.iter().cloned().collect();
        self.store
            .mark_summaries_stale(&to_mark)
            .map_err(AriadneError::Storage)?;

        info!(
            changed = affected.changed.len(),
            dependents = affected.dependents.len(),
            "Dependency analysis complete"
        );
        Ok(affected)
    }

    /// Direct callers (1-hop only), resolved to symbols.
    pub fn get_callers(
        &self,
        fqn: &str,
    ) -> AriadneResult<Vec<ariadne_core::models::SymbolRecord>> {
        self.store
            .get_related_symbols(
                fqn,
                Some(ariadne_core::models::Relation::Calls),
                ariadne_storage::Direction::Incoming,
            )
            .map_err(AriadneError::Storage)
    }

    /// Direct callees (1-hop only), resolved to symbols.
    pub fn get_callees(
        &self,
        fqn: &str,
    ) -> AriadneResult<Vec<ariadne_core::models::SymbolRecord>> {
        self.store
            .get_related_symbols(
                fqn,
                Some(ariadne_core::models::Relation::Calls),
                ariadne_storage::Direction::Outgoing,
            )
            .map_err(AriadneError::Storage)
    }

    /// Containing parent symbol, if any.
    pub fn get_parent_symbol(
        &self,
        fqn: &str,
    ) -> AriadneResult<Option<ariadne_core::models::SymbolRecord>> {
        let Some(symbol) = self.store.get_symbol(fqn).map_err(AriadneError::Storage)? else {
            return Ok(None);
        };
        let Some(parent_fqn) = symbol.symbol.parent_fqn else {
            return Ok(None);
        };
        self.store
            .get_symbol(&parent_fqn)
            .map_err(AriadneError::Storage)
    }
}

fn placeholders(count: usize) -> String {
    let mut s = String::with_capacity(count * 2);
    for i in 0..count {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}

fn sqe(e: rusqlite::Error) -> ariadne_core::StorageError {
    ariadne_core::StorageError::SqliteError {
        message: e.to_string(),
    }
}
