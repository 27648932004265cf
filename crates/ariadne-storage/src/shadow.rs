//! Shadow rebuild with atomic swap.
//!
//! The whole-graph reconstruction never exposes an inconsistent database:
//! a fresh file is built alongside the live one, verified, and swapped in
//! via rename. The previous database survives as a timestamped backup, and
//! an incomplete swap is detected and completed at startup.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::{error, info, warn};

use ariadne_core::{AriadneError, AriadneResult};

use crate::sqe;
use crate::store::GraphStore;

/// Backups kept by default after a successful swap.
pub const DEFAULT_KEEP_BACKUPS: usize = 3;

/// Statistics of one full rebuild.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RebuildStats {
    pub symbols_indexed: i64,
    pub edges_created: i64,
    pub entries_detected: i64,
    pub deps_analyzed: i64,
    pub duration_seconds: f64,
    pub backup_path: Option<String>,
}

pub struct ShadowRebuilder {
    db_path: PathBuf,
}

impl ShadowRebuilder {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Rebuild the whole graph in a shadow file, verify it, and swap it in.
    ///
    /// `populate` receives a store opened on the shadow file and must fill
    /// it completely (the extractor drives this). On any failure the shadow
    /// file is deleted and the live database is untouched.
    pub fn rebuild_full<F>(&self, store: &GraphStore, populate: F) -> AriadneResult<RebuildStats>
    where
        F: FnOnce(&std::sync::Arc<GraphStore>) -> AriadneResult<()>,
    {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let shadow_path = self.shadow_path(&timestamp);
        let backup_path = self.backup_path(&timestamp);
        let started = Instant::now();

        info!(
            shadow = %shadow_path.display(),
            "Starting shadow rebuild"
        );

        let result = self.build_and_swap(store, populate, &shadow_path, &backup_path);

        match result {
            Ok(mut stats) => {
                stats.duration_seconds = started.elapsed().as_secs_f64();
                stats.backup_path = Some(backup_path.display().to_string());

                let removed = cleanup_old_backups(&self.db_path, DEFAULT_KEEP_BACKUPS);
                if !removed.is_empty() {
                    info!(removed = removed.len(), "Pruned old backups");
                }

                info!(
                    symbols = stats.symbols_indexed,
                    edges = stats.edges_created,
                    duration = stats.duration_seconds,
                    backup = %backup_path.display(),
                    "Shadow rebuild complete"
                );
                Ok(stats)
            }
            Err(e) => {
                error!(error = %e, "Rebuild failed, keeping current database");
                if shadow_path.exists() {
                    if let Err(cleanup) = std::fs::remove_file(&shadow_path) {
                        warn!(
                            shadow = %shadow_path.display(),
                            error = %cleanup,
                            "Failed to remove incomplete shadow database"
                        );
                    }
                }
                match e {
                    AriadneError::Integrity(_) => Err(e),
                    other => Err(AriadneError::RebuildFailed(other.to_string())),
                }
            }
        }
    }

    fn build_and_swap<F>(
        &self,
        store: &GraphStore,
        populate: F,
        shadow_path: &Path,
        backup_path: &Path,
    ) -> AriadneResult<RebuildStats>
    where
        F: FnOnce(&std::sync::Arc<GraphStore>) -> AriadneResult<()>,
    {
        // Step 1: build the new index in a separate file.
        let stats = {
            let shadow_store = std::sync::Arc::new(GraphStore::open(shadow_path)?);
            populate(&shadow_store)?;
            let stats = RebuildStats {
                symbols_indexed: shadow_store.symbol_count()?,
                edges_created: shadow_store.edge_count()?,
                entries_detected: shadow_store.entry_point_count()?,
                deps_analyzed: shadow_store.external_dependency_count()?,
                ..Default::default()
            };
            shadow_store.checkpoint()?;
            stats
            // shadow_store drops here, closing its connections.
        };

        // Step 2: verify before the live database is touched.
        verify_shadow(shadow_path)?;

        // Step 3: atomic swap, current preserved as backup.
        store.swap_files(shadow_path, backup_path)?;

        Ok(stats)
    }

    fn shadow_path(&self, timestamp: &str) -> PathBuf {
        let stem = self
            .db_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("ariadne");
        self.db_path
            .with_file_name(format!("{stem}_new_{timestamp}.db"))
    }

    fn backup_path(&self, timestamp: &str) -> PathBuf {
        let name = self
            .db_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("ariadne.db");
        self.db_path
            .with_file_name(format!("{name}_backup_{timestamp}"))
    }
}

/// The four verification checks a shadow must pass before it may be
/// swapped in. Any failure is an integrity error; the caller deletes the
/// shadow and leaves the live database alone.
pub fn verify_shadow(shadow_path: &Path) -> AriadneResult<()> {
    let conn = Connection::open_with_flags(shadow_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(sqe)
        .map_err(AriadneError::Storage)?;

    // Check 1: the index is not empty.
    let symbol_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM symbols", [], |row| row.get(0))
        .map_err(|e| AriadneError::Integrity(format!("symbol count query failed: {e}")))?;
    if symbol_count == 0 {
        return Err(AriadneError::Integrity(
            "no symbols indexed - database is empty".to_string(),
        ));
    }

    // Check 2: zero orphaned edges on either side.
    let orphaned_from: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM edges e
             LEFT JOIN symbols s ON e.from_fqn = s.fqn
             WHERE s.fqn IS NULL",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AriadneError::Integrity(e.to_string()))?;
    let orphaned_to: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM edges e
             LEFT JOIN symbols s ON e.to_fqn = s.fqn
             WHERE s.fqn IS NULL",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AriadneError::Integrity(e.to_string()))?;
    let orphaned = orphaned_from + orphaned_to;
    if orphaned > 0 {
        return Err(AriadneError::Integrity(format!(
            "{orphaned} orphaned edges detected"
        )));
    }

    // Check 3: declared foreign keys hold.
    let fk_violations: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_foreign_key_check",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AriadneError::Integrity(e.to_string()))?;
    if fk_violations > 0 {
        return Err(AriadneError::Integrity(format!(
            "{fk_violations} foreign key violations"
        )));
    }

    // Check 4: engine-level integrity.
    let integrity: String = conn
        .pragma_query_value(None, "integrity_check", |row| row.get(0))
        .map_err(|e| AriadneError::Integrity(e.to_string()))?;
    if integrity != "ok" {
        return Err(AriadneError::Integrity(format!(
            "integrity check failed: {integrity}"
        )));
    }

    info!(symbols = symbol_count, "Shadow verification passed");
    Ok(())
}

/// Startup recovery for a swap interrupted between the two renames:
/// a backup exists but the live file is missing or zero-sized. Restores
/// the newest backup and removes leftover shadow files.
///
/// Returns the restored backup path if recovery ran.
pub fn recover_incomplete_swap(db_path: &Path) -> AriadneResult<Option<PathBuf>> {
    let current_ok = db_path.exists()
        && std::fs::metadata(db_path).map(|m| m.len() > 0).unwrap_or(false);

    // Leftover shadow files from a crashed build are dead weight either way.
    for shadow in list_siblings_matching(db_path, "_new_") {
        warn!(shadow = %shadow.display(), "Removing leftover shadow database");
        let _ = std::fs::remove_file(&shadow);
    }

    if current_ok {
        return Ok(None);
    }

    let mut backups = list_backups(db_path);
    backups.sort_by_key(|p| std::cmp::Reverse(mtime_of(p)));
    let Some(newest) = backups.first().cloned() else {
        return Ok(None);
    };

    if db_path.exists() {
        std::fs::remove_file(db_path).map_err(|e| {
            AriadneError::RebuildFailed(format!("cannot clear zero-sized database: {e}"))
        })?;
    }
    std::fs::rename(&newest, db_path)
        .map_err(|e| AriadneError::RebuildFailed(format!("backup restore failed: {e}")))?;

    warn!(
        restored = %newest.display(),
        "Recovered from incomplete swap at startup"
    );
    Ok(Some(newest))
}

/// Delete all but the `keep_count` most-recent backups (by mtime).
/// Returns the removed paths.
pub fn cleanup_old_backups(db_path: &Path, keep_count: usize) -> Vec<PathBuf> {
    let mut backups = list_backups(db_path);
    backups.sort_by_key(|p| std::cmp::Reverse(mtime_of(p)));

    let mut removed = Vec::new();
    for backup in backups.into_iter().skip(keep_count) {
        match std::fs::remove_file(&backup) {
            Ok(()) => {
                info!(backup = %backup.display(), "Removed old backup");
                removed.push(backup);
            }
            Err(e) => warn!(backup = %backup.display(), error = %e, "Failed to remove backup"),
        }
    }
    removed
}

/// Backups of `db_path`: siblings named `<db_name>_backup_*`.
pub fn list_backups(db_path: &Path) -> Vec<PathBuf> {
    list_siblings_matching(db_path, "_backup_")
}

fn list_siblings_matching(db_path: &Path, marker: &str) -> Vec<PathBuf> {
    let dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let db_name = db_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let stem = db_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            let Some(name) = p.file_name().and_then(|s| s.to_str()) else {
                return false;
            };
            // Backups: `<db_name>_backup_<ts>`; shadows: `<stem>_new_<ts>.db`.
            (marker == "_backup_" && name.starts_with(&format!("{db_name}{marker}")))
                || (marker == "_new_" && name.starts_with(&format!("{stem}{marker}")))
        })
        .collect()
}

fn mtime_of(path: &Path) -> std::time::SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
}
