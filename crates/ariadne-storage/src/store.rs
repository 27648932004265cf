//! `GraphStore` — the single thread-safe entry point to the graph database.
//!
//! Owns the connection pool behind an RwLock: normal reads and writes take
//! the read side (many threads in parallel, each borrowing a pooled
//! connection), while the shadow swap takes the write side, closes every
//! connection, renames the files, and reopens. A reader therefore sees the
//! pre-swap database fully or the post-swap database fully, never a mix.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use rusqlite::Connection;
use tracing::{error, info};

use ariadne_core::models::{
    AntiPattern, Edge, EntryPoint, ExternalDependency, GlossaryEntry, Relation, Severity,
    Summary, SummaryLevel, Symbol, SymbolKind, SymbolRecord, TraversalRow,
};
use ariadne_core::models::{ConstraintEntry, ConstraintType, DependencyType, EntryType};
use ariadne_core::StorageError;

use crate::migrations;
use crate::pool::{ConnectionPool, DEFAULT_READ_POOL_SIZE};
use crate::queries;
use crate::queries::anti_patterns::AntiPatternRecord;
use crate::queries::constraints::ConstraintRecord;
use crate::queries::edges::EdgeRecord;
use crate::queries::glossary::GlossaryRecord;
use crate::queries::summaries::SummaryRecord;

pub struct GraphStore {
    pool: RwLock<Option<ConnectionPool>>,
    path: Option<PathBuf>,
    read_pool_size: usize,
}

impl GraphStore {
    /// Open a file-backed store. Runs migrations and the startup
    /// consistency pass; a migration that cannot apply aborts startup.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::open_with_pool_size(path, DEFAULT_READ_POOL_SIZE)
    }

    pub fn open_with_pool_size(path: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        let pool = ConnectionPool::open(path, read_pool_size)?;
        pool.with_writer(|conn| migrations::migrate(conn).map(|_| ()))?;
        Ok(Self {
            pool: RwLock::new(Some(pool)),
            path: Some(path.to_path_buf()),
            read_pool_size,
        })
    }

    /// Open an in-memory store (tests).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let pool = ConnectionPool::open_in_memory()?;
        pool.with_writer(|conn| migrations::migrate(conn).map(|_| ()))?;
        Ok(Self {
            pool: RwLock::new(Some(pool)),
            path: None,
            read_pool_size: 0,
        })
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a closure against a reader connection.
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self
            .pool
            .read()
            .map_err(|e| StorageError::sqlite(format!("pool lock poisoned: {e}")))?;
        match guard.as_ref() {
            Some(pool) => pool.with_reader(f),
            None => Err(StorageError::DbBusy),
        }
    }

    /// Run a closure against the writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self
            .pool
            .read()
            .map_err(|e| StorageError::sqlite(format!("pool lock poisoned: {e}")))?;
        match guard.as_ref() {
            Some(pool) => pool.with_writer(f),
            None => Err(StorageError::DbBusy),
        }
    }

    /// Open an extra read-write connection to the same file (used by the
    /// dual-write coordinator for orphan tracking that must survive a
    /// rollback of the writer's transaction). None when in-memory.
    pub fn open_aux_connection(&self) -> Result<Option<Connection>, StorageError> {
        let guard = self
            .pool
            .read()
            .map_err(|e| StorageError::sqlite(format!("pool lock poisoned: {e}")))?;
        match guard.as_ref() {
            Some(pool) => pool.open_aux_connection(),
            None => Err(StorageError::DbBusy),
        }
    }

    /// WAL checkpoint delegation.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        let guard = self
            .pool
            .read()
            .map_err(|e| StorageError::sqlite(format!("pool lock poisoned: {e}")))?;
        match guard.as_ref() {
            Some(pool) => pool.checkpoint(),
            None => Err(StorageError::DbBusy),
        }
    }

    /// Swap the live database file for `shadow`, preserving the old file at
    /// `backup`. Only the shadow rebuilder calls this, and only during the
    /// swap window. Holds the pool's write lock for the whole sequence.
    pub fn swap_files(&self, shadow: &Path, backup: &Path) -> Result<(), StorageError> {
        let current = self.path.as_deref().ok_or_else(|| {
            StorageError::SwapFailed {
                message: "in-memory store cannot swap files".to_string(),
            }
        })?;

        let mut guard = self
            .pool
            .write()
            .map_err(|e| StorageError::sqlite(format!("pool lock poisoned: {e}")))?;

        // Close every connection before touching the files.
        *guard = None;

        let swap = || -> Result<(), StorageError> {
            if current.exists() {
                std::fs::rename(current, backup)?;
            }
            if let Err(e) = std::fs::rename(shadow, current) {
                // Reverse the first rename so the old database stays live.
                if backup.exists() && !current.exists() {
                    if let Err(restore) = std::fs::rename(backup, current) {
                        error!(error = %restore, "Failed to restore backup after swap error");
                    }
                }
                return Err(StorageError::SwapFailed {
                    message: e.to_string(),
                });
            }
            Ok(())
        };
        let swap_result = swap();

        // Reopen regardless: either the new file or the restored old one.
        let reopen = ConnectionPool::open(current, self.read_pool_size);
        match reopen {
            Ok(pool) => {
                *guard = Some(pool);
            }
            Err(e) => {
                error!(error = %e, "Failed to reopen pool after swap");
                return Err(e);
            }
        }

        swap_result?;
        info!(current = %current.display(), backup = %backup.display(), "Atomic swap complete");
        Ok(())
    }

    // ─── Symbols ────────────────────────────────────────────────────────────

    pub fn insert_symbols(&self, symbols: &[Symbol]) -> Result<usize, StorageError> {
        self.with_writer(|conn| queries::symbols::insert_symbols(conn, symbols))
    }

    pub fn get_symbol(&self, fqn: &str) -> Result<Option<SymbolRecord>, StorageError> {
        self.with_reader(|conn| queries::symbols::get_symbol(conn, fqn))
    }

    pub fn get_symbols_by_kind(&self, kind: SymbolKind) -> Result<Vec<SymbolRecord>, StorageError> {
        self.with_reader(|conn| queries::symbols::get_symbols_by_kind(conn, kind))
    }

    pub fn get_symbols_by_parent(
        &self,
        parent_fqn: &str,
    ) -> Result<Vec<SymbolRecord>, StorageError> {
        self.with_reader(|conn| queries::symbols::get_symbols_by_parent(conn, parent_fqn))
    }

    pub fn get_symbols_by_fqns(&self, fqns: &[String]) -> Result<Vec<SymbolRecord>, StorageError> {
        self.with_reader(|conn| queries::symbols::get_symbols_by_fqns(conn, fqns))
    }

    pub fn search_symbols(
        &self,
        name_pattern: &str,
        kind: Option<SymbolKind>,
    ) -> Result<Vec<SymbolRecord>, StorageError> {
        self.with_reader(|conn| queries::symbols::search_symbols(conn, name_pattern, kind))
    }

    pub fn symbol_count(&self) -> Result<i64, StorageError> {
        self.with_reader(queries::symbols::count_symbols)
    }

    /// Delete all symbols with the given file path; cascade triggers clean
    /// dependents. Returns symbols deleted.
    pub fn clean_by_file(&self, file_path: &str) -> Result<usize, StorageError> {
        self.with_writer(|conn| queries::symbols::clean_by_file(conn, file_path))
    }

    /// Wipe the whole graph (symbols, edges, index metadata); the cascade
    /// machinery empties every dependent table. Returns rows deleted per
    /// table.
    pub fn clean_all(&self) -> Result<Vec<(&'static str, usize)>, StorageError> {
        self.with_writer(|conn| {
            let tx = conn.unchecked_transaction().map_err(crate::sqe)?;
            let mut counts = Vec::new();
            for table in ["edges", "symbols", "index_metadata"] {
                let n = tx
                    .execute(&format!("DELETE FROM {table}"), [])
                    .map_err(crate::sqe)?;
                counts.push((table, n));
            }
            tx.commit().map_err(crate::sqe)?;
            Ok(counts)
        })
    }

    pub fn fqns_in_file(&self, file_path: &str) -> Result<Vec<String>, StorageError> {
        self.with_reader(|conn| queries::symbols::fqns_in_file(conn, file_path))
    }

    // ─── Edges & traversal ──────────────────────────────────────────────────

    pub fn insert_edges(&self, edges: &[Edge]) -> Result<usize, StorageError> {
        self.with_writer(|conn| queries::edges::insert_edges(conn, edges))
    }

    pub fn get_edges_from(
        &self,
        fqn: &str,
        relation: Option<Relation>,
    ) -> Result<Vec<EdgeRecord>, StorageError> {
        self.with_reader(|conn| queries::edges::get_edges_from(conn, fqn, relation))
    }

    pub fn get_edges_to(
        &self,
        fqn: &str,
        relation: Option<Relation>,
    ) -> Result<Vec<EdgeRecord>, StorageError> {
        self.with_reader(|conn| queries::edges::get_edges_to(conn, fqn, relation))
    }

    pub fn edge_count(&self) -> Result<i64, StorageError> {
        self.with_reader(queries::edges::count_edges)
    }

    pub fn edge_count_touching(&self, fqn: &str) -> Result<i64, StorageError> {
        self.with_reader(|conn| queries::edges::count_edges_touching(conn, fqn))
    }

    pub fn get_call_chain(
        &self,
        start_fqn: &str,
        max_depth: i64,
    ) -> Result<Vec<TraversalRow>, StorageError> {
        self.with_reader(|conn| queries::traversal::get_call_chain(conn, start_fqn, max_depth))
    }

    pub fn get_reverse_callers(
        &self,
        target_fqn: &str,
        max_depth: i64,
    ) -> Result<Vec<TraversalRow>, StorageError> {
        self.with_reader(|conn| {
            queries::traversal::get_reverse_callers(conn, target_fqn, max_depth)
        })
    }

    /// Resolved neighbour symbols by edge relation.
    ///
    /// `direction` is validated by the caller-facing enum; `both` unions
    /// outgoing and incoming neighbours.
    pub fn get_related_symbols(
        &self,
        fqn: &str,
        relation: Option<Relation>,
        direction: Direction,
    ) -> Result<Vec<SymbolRecord>, StorageError> {
        self.with_reader(|conn| {
            let mut results = Vec::new();

            if matches!(direction, Direction::Outgoing | Direction::Both) {
                let edges = queries::edges::get_edges_from(conn, fqn, relation)?;
                let fqns: Vec<String> = edges.into_iter().map(|e| e.to_fqn).collect();
                results.extend(queries::symbols::get_symbols_by_fqns(conn, &fqns)?);
            }
            if matches!(direction, Direction::Incoming | Direction::Both) {
                let edges = queries::edges::get_edges_to(conn, fqn, relation)?;
                let fqns: Vec<String> = edges.into_iter().map(|e| e.from_fqn).collect();
                results.extend(queries::symbols::get_symbols_by_fqns(conn, &fqns)?);
            }
            Ok(results)
        })
    }

    // ─── Entry points ───────────────────────────────────────────────────────

    pub fn insert_entry_points(&self, entries: &[EntryPoint]) -> Result<usize, StorageError> {
        self.with_writer(|conn| queries::entry_points::insert_entry_points(conn, entries))
    }

    pub fn get_entry_points(
        &self,
        entry_type: Option<EntryType>,
    ) -> Result<Vec<EntryPoint>, StorageError> {
        self.with_reader(|conn| queries::entry_points::get_entry_points(conn, entry_type))
    }

    pub fn get_entry_points_for_fqns(
        &self,
        fqns: &[String],
    ) -> Result<Vec<EntryPoint>, StorageError> {
        self.with_reader(|conn| queries::entry_points::get_entry_points_for_fqns(conn, fqns))
    }

    pub fn entry_point_count(&self) -> Result<i64, StorageError> {
        self.with_reader(queries::entry_points::count_entry_points)
    }

    // ─── External dependencies ──────────────────────────────────────────────

    pub fn insert_external_dependencies(
        &self,
        deps: &[ExternalDependency],
    ) -> Result<usize, StorageError> {
        self.with_writer(|conn| queries::dependencies::insert_external_dependencies(conn, deps))
    }

    pub fn get_external_dependencies(
        &self,
        caller_fqn: Option<&str>,
        dependency_type: Option<DependencyType>,
    ) -> Result<Vec<ExternalDependency>, StorageError> {
        self.with_reader(|conn| {
            queries::dependencies::get_external_dependencies(conn, caller_fqn, dependency_type)
        })
    }

    pub fn external_dependency_count(&self) -> Result<i64, StorageError> {
        self.with_reader(queries::dependencies::count_external_dependencies)
    }

    // ─── Anti-patterns ──────────────────────────────────────────────────────

    pub fn insert_anti_patterns(&self, patterns: &[AntiPattern]) -> Result<usize, StorageError> {
        self.with_writer(|conn| queries::anti_patterns::insert_anti_patterns(conn, patterns))
    }

    pub fn get_anti_patterns(
        &self,
        rule_id: Option<&str>,
        severity: Option<Severity>,
    ) -> Result<Vec<AntiPatternRecord>, StorageError> {
        self.with_reader(|conn| queries::anti_patterns::get_anti_patterns(conn, rule_id, severity))
    }

    pub fn clear_anti_patterns(&self) -> Result<usize, StorageError> {
        self.with_writer(queries::anti_patterns::clear_anti_patterns)
    }

    // ─── Summaries ──────────────────────────────────────────────────────────

    pub fn upsert_summary(&self, summary: &Summary) -> Result<(), StorageError> {
        self.with_writer(|conn| queries::summaries::upsert_summary(conn, summary))
    }

    pub fn get_summary(
        &self,
        target_fqn: &str,
        level: Option<SummaryLevel>,
    ) -> Result<Option<SummaryRecord>, StorageError> {
        self.with_reader(|conn| queries::summaries::get_summary(conn, target_fqn, level))
    }

    pub fn mark_summaries_stale(&self, fqns: &[String]) -> Result<usize, StorageError> {
        self.with_writer(|conn| queries::summaries::mark_summaries_stale(conn, fqns))
    }

    pub fn get_stale_summaries(&self, limit: i64) -> Result<Vec<SummaryRecord>, StorageError> {
        self.with_reader(|conn| queries::summaries::get_stale_summaries(conn, limit))
    }

    pub fn get_staleness(&self, fqns: &[String]) -> Result<Vec<(String, bool)>, StorageError> {
        self.with_reader(|conn| queries::summaries::get_staleness(conn, fqns))
    }

    pub fn update_summary_vector_id(
        &self,
        target_fqn: &str,
        vector_id: &str,
    ) -> Result<(), StorageError> {
        self.with_writer(|conn| queries::summaries::update_vector_id(conn, target_fqn, vector_id))
    }

    pub fn get_summaries_by_level(
        &self,
        level: SummaryLevel,
    ) -> Result<Vec<SummaryRecord>, StorageError> {
        self.with_reader(|conn| queries::summaries::get_summaries_by_level(conn, level))
    }

    pub fn summary_count(&self) -> Result<i64, StorageError> {
        self.with_reader(queries::summaries::count_summaries)
    }

    // ─── Glossary ───────────────────────────────────────────────────────────

    pub fn upsert_glossary_entry(&self, entry: &GlossaryEntry) -> Result<i64, StorageError> {
        self.with_writer(|conn| queries::glossary::upsert_glossary_entry(conn, entry))
    }

    pub fn get_glossary_entry(
        &self,
        code_term: &str,
    ) -> Result<Option<GlossaryRecord>, StorageError> {
        self.with_reader(|conn| queries::glossary::get_glossary_entry(conn, code_term))
    }

    pub fn get_glossary_by_id(&self, id: i64) -> Result<Option<GlossaryRecord>, StorageError> {
        self.with_reader(|conn| queries::glossary::get_glossary_by_id(conn, id))
    }

    pub fn search_glossary(&self, pattern: &str) -> Result<Vec<GlossaryRecord>, StorageError> {
        self.with_reader(|conn| queries::glossary::search_glossary(conn, pattern))
    }

    pub fn get_glossary_by_source(
        &self,
        source_fqn: &str,
    ) -> Result<Vec<GlossaryRecord>, StorageError> {
        self.with_reader(|conn| queries::glossary::get_glossary_by_source(conn, source_fqn))
    }

    pub fn update_glossary_vector_id(
        &self,
        code_term: &str,
        vector_id: &str,
    ) -> Result<(), StorageError> {
        self.with_writer(|conn| {
            queries::glossary::update_glossary_vector_id(conn, code_term, vector_id)
        })
    }

    pub fn glossary_count(&self) -> Result<i64, StorageError> {
        self.with_reader(queries::glossary::count_glossary)
    }

    // ─── Constraints ────────────────────────────────────────────────────────

    pub fn upsert_constraint(&self, entry: &ConstraintEntry) -> Result<i64, StorageError> {
        self.with_writer(|conn| queries::constraints::upsert_constraint(conn, entry))
    }

    pub fn get_constraint(&self, name: &str) -> Result<Option<ConstraintRecord>, StorageError> {
        self.with_reader(|conn| queries::constraints::get_constraint(conn, name))
    }

    pub fn get_constraint_by_id(&self, id: i64) -> Result<Option<ConstraintRecord>, StorageError> {
        self.with_reader(|conn| queries::constraints::get_constraint_by_id(conn, id))
    }

    pub fn get_constraints_by_type(
        &self,
        constraint_type: ConstraintType,
    ) -> Result<Vec<ConstraintRecord>, StorageError> {
        self.with_reader(|conn| queries::constraints::get_constraints_by_type(conn, constraint_type))
    }

    pub fn get_constraints_by_source(
        &self,
        source_fqn: &str,
    ) -> Result<Vec<ConstraintRecord>, StorageError> {
        self.with_reader(|conn| queries::constraints::get_constraints_by_source(conn, source_fqn))
    }

    pub fn search_constraints(
        &self,
        pattern: &str,
    ) -> Result<Vec<ConstraintRecord>, StorageError> {
        self.with_reader(|conn| queries::constraints::search_constraints(conn, pattern))
    }

    pub fn update_constraint_vector_id(
        &self,
        name: &str,
        vector_id: &str,
    ) -> Result<(), StorageError> {
        self.with_writer(|conn| {
            queries::constraints::update_constraint_vector_id(conn, name, vector_id)
        })
    }

    pub fn constraint_count(&self) -> Result<i64, StorageError> {
        self.with_reader(queries::constraints::count_constraints)
    }

    // ─── Metadata ───────────────────────────────────────────────────────────

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_reader(|conn| queries::metadata::get_metadata(conn, key))
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_writer(|conn| queries::metadata::set_metadata(conn, key, value))
    }
}

/// Direction of a related-symbols lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
    Both,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "incoming" => Some(Self::Incoming),
            "outgoing" => Some(Self::Outgoing),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}
