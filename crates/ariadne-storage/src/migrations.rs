//! Schema versioning via `PRAGMA user_version` plus the startup
//! consistency pass: recreate cascade triggers idempotently and delete
//! orphaned rows across all dependent tables (counted and logged, never
//! silently).

use std::collections::BTreeMap;

use rusqlite::Connection;
use tracing::{info, warn};

use ariadne_core::StorageError;

use crate::schema::{ALL_SCHEMAS, SCHEMA_EDGE_TRIGGERS};
use crate::sqe;

/// Current schema version. Bump when adding migrations.
pub const CURRENT_VERSION: u32 = 1;

/// Read the schema version from the database.
pub fn get_schema_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(sqe)
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<(), StorageError> {
    conn.pragma_update(None, "user_version", version).map_err(sqe)
}

/// Run all pending migrations, then the consistency pass.
///
/// Returns the version the database ended at. A migration that cannot
/// apply cleanly is fatal to startup.
pub fn migrate(conn: &Connection) -> Result<u32, StorageError> {
    let current = get_schema_version(conn)?;

    if current < 1 {
        info!("Migrating schema: 0 -> 1 (initial tables)");
        for block in ALL_SCHEMAS {
            conn.execute_batch(block)
                .map_err(|e| StorageError::MigrationFailed {
                    version: 1,
                    message: e.to_string(),
                })?;
        }
        set_schema_version(conn, 1)?;
    }

    // Future migrations go here:
    // if current < 2 { ... }

    ensure_consistency(conn)?;

    let final_version = get_schema_version(conn)?;
    if final_version != current {
        info!(from = current, to = final_version, "Schema migration complete");
    }
    Ok(final_version)
}

/// Recreate cascade triggers (idempotent) and delete orphaned rows left by
/// databases written before the triggers existed, or by crashes between
/// related writes.
pub fn ensure_consistency(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(SCHEMA_EDGE_TRIGGERS).map_err(sqe)?;
    ensure_dependent_triggers(conn)?;

    let orphans = cleanup_orphans(conn)?;
    let total: i64 = orphans.values().sum();
    if total > 0 {
        info!(total, counts = ?orphans, "Removed orphaned rows during startup pass");
    }
    Ok(())
}

/// Triggers equivalent to the declared cascading foreign keys, covering
/// databases whose tables predate the FK declarations (SQLite cannot ALTER
/// a constraint in place).
fn ensure_dependent_triggers(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE TRIGGER IF NOT EXISTS entry_points_cascade_delete
            AFTER DELETE ON symbols
            FOR EACH ROW
            WHEN EXISTS (SELECT 1 FROM entry_points WHERE symbol_fqn = OLD.fqn)
        BEGIN
            DELETE FROM entry_points WHERE symbol_fqn = OLD.fqn;
        END;

        CREATE TRIGGER IF NOT EXISTS external_dependencies_cascade_delete
            AFTER DELETE ON symbols
            FOR EACH ROW
            WHEN EXISTS (SELECT 1 FROM external_dependencies WHERE caller_fqn = OLD.fqn)
        BEGIN
            DELETE FROM external_dependencies WHERE caller_fqn = OLD.fqn;
        END;

        CREATE TRIGGER IF NOT EXISTS summaries_cascade_delete
            AFTER DELETE ON symbols
            FOR EACH ROW
            WHEN EXISTS (SELECT 1 FROM summaries WHERE target_fqn = OLD.fqn)
        BEGIN
            DELETE FROM summaries WHERE target_fqn = OLD.fqn;
        END;

        CREATE TRIGGER IF NOT EXISTS anti_patterns_cascade_delete
            AFTER DELETE ON symbols
            FOR EACH ROW
            WHEN EXISTS (SELECT 1 FROM anti_patterns WHERE from_fqn = OLD.fqn)
        BEGIN
            DELETE FROM anti_patterns WHERE from_fqn = OLD.fqn;
        END;

        CREATE TRIGGER IF NOT EXISTS glossary_null_source_on_symbol_delete
            AFTER DELETE ON symbols
            FOR EACH ROW
            WHEN EXISTS (SELECT 1 FROM glossary WHERE source_fqn = OLD.fqn)
        BEGIN
            UPDATE glossary SET source_fqn = NULL WHERE source_fqn = OLD.fqn;
        END;

        CREATE TRIGGER IF NOT EXISTS constraints_null_source_on_symbol_delete
            AFTER DELETE ON symbols
            FOR EACH ROW
            WHEN EXISTS (SELECT 1 FROM constraints WHERE source_fqn = OLD.fqn)
        BEGIN
            UPDATE constraints SET source_fqn = NULL WHERE source_fqn = OLD.fqn;
        END;
        ",
    )
    .map_err(sqe)
}

/// Delete (or null out) rows referencing symbols that no longer exist.
/// Returns per-table counts of rows touched.
fn cleanup_orphans(conn: &Connection) -> Result<BTreeMap<&'static str, i64>, StorageError> {
    let mut counts = BTreeMap::new();

    let deletes: [(&'static str, &str); 6] = [
        (
            "edges_from",
            "DELETE FROM edges WHERE from_fqn NOT IN (SELECT fqn FROM symbols)",
        ),
        (
            "edges_to",
            "DELETE FROM edges WHERE to_fqn NOT IN (SELECT fqn FROM symbols)",
        ),
        (
            "entry_points",
            "DELETE FROM entry_points WHERE symbol_fqn NOT IN (SELECT fqn FROM symbols)",
        ),
        (
            "external_dependencies",
            "DELETE FROM external_dependencies WHERE caller_fqn NOT IN (SELECT fqn FROM symbols)",
        ),
        (
            "summaries",
            "DELETE FROM summaries WHERE target_fqn NOT IN (SELECT fqn FROM symbols)",
        ),
        (
            "anti_patterns",
            "DELETE FROM anti_patterns WHERE from_fqn NOT IN (SELECT fqn FROM symbols)",
        ),
    ];
    for (name, sql) in deletes {
        let n = conn.execute(sql, []).map_err(sqe)? as i64;
        if n > 0 {
            warn!(table = name, removed = n, "Orphaned rows deleted");
            counts.insert(name, n);
        }
    }

    let nulls: [(&'static str, &str); 2] = [
        (
            "glossary",
            "UPDATE glossary SET source_fqn = NULL
             WHERE source_fqn IS NOT NULL AND source_fqn NOT IN (SELECT fqn FROM symbols)",
        ),
        (
            "constraints",
            "UPDATE constraints SET source_fqn = NULL
             WHERE source_fqn IS NOT NULL AND source_fqn NOT IN (SELECT fqn FROM symbols)",
        ),
    ];
    for (name, sql) in nulls {
        let n = conn.execute(sql, []).map_err(sqe)? as i64;
        if n > 0 {
            warn!(table = name, nulled = n, "Orphaned source references cleared");
            counts.insert(name, n);
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pragmas::configure_connection;

    fn fresh_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();
        conn
    }

    #[test]
    fn fresh_db_version_is_zero() {
        let conn = fresh_db();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn migrate_from_zero_to_v1() {
        let conn = fresh_db();
        let version = migrate(&conn).unwrap();
        assert_eq!(version, 1);

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='symbols'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = fresh_db();
        let v1 = migrate(&conn).unwrap();
        let v2 = migrate(&conn).unwrap();
        assert_eq!(v1, v2);
        assert_eq!(v2, 1);
    }

    #[test]
    fn consistency_pass_removes_orphaned_edges() {
        let conn = fresh_db();
        migrate(&conn).unwrap();

        // Plant an orphan directly (no symbols exist at all).
        conn.execute(
            "INSERT INTO edges (from_fqn, to_fqn, relation) VALUES ('a', 'b', 'calls')",
            [],
        )
        .unwrap();

        ensure_consistency(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
