//! entry_points table queries.

use rusqlite::{params, params_from_iter, Connection};

use ariadne_core::models::{EntryPoint, EntryType};
use ariadne_core::StorageError;

use crate::sqe;

use super::{collect_rows, placeholders};

/// Upsert keyed on `symbol_fqn` (one entry per symbol).
pub fn insert_entry_points(
    conn: &Connection,
    entries: &[EntryPoint],
) -> Result<usize, StorageError> {
    if entries.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction().map_err(sqe)?;
    {
        let mut stmt = tx
            .prepare_cached(
                "INSERT INTO entry_points
                 (symbol_fqn, entry_type, http_method, http_path, cron_expression, mq_queue)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(symbol_fqn) DO UPDATE SET
                 entry_type = excluded.entry_type,
                 http_method = excluded.http_method,
                 http_path = excluded.http_path,
                 cron_expression = excluded.cron_expression,
                 mq_queue = excluded.mq_queue",
            )
            .map_err(sqe)?;
        for e in entries {
            stmt.execute(params![
                e.symbol_fqn,
                e.entry_type.as_str(),
                e.http_method,
                e.http_path,
                e.cron_expression,
                e.mq_queue,
            ])
            .map_err(sqe)?;
        }
    }
    tx.commit().map_err(sqe)?;
    Ok(entries.len())
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryPoint> {
    let entry_type_str: String = row.get(1)?;
    Ok(EntryPoint {
        symbol_fqn: row.get(0)?,
        entry_type: EntryType::parse(&entry_type_str).unwrap_or(EntryType::HttpApi),
        http_method: row.get(2)?,
        http_path: row.get(3)?,
        cron_expression: row.get(4)?,
        mq_queue: row.get(5)?,
    })
}

const ENTRY_COLUMNS: &str =
    "symbol_fqn, entry_type, http_method, http_path, cron_expression, mq_queue";

/// Entry points, optionally filtered by type.
pub fn get_entry_points(
    conn: &Connection,
    entry_type: Option<EntryType>,
) -> Result<Vec<EntryPoint>, StorageError> {
    match entry_type {
        Some(t) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entry_points WHERE entry_type = ?1"
                ))
                .map_err(sqe)?;
            let rows = stmt
                .query_map(params![t.as_str()], map_entry_row)
                .map_err(sqe)?;
            collect_rows(rows)
        }
        None => {
            let mut stmt = conn
                .prepare_cached(&format!("SELECT {ENTRY_COLUMNS} FROM entry_points"))
                .map_err(sqe)?;
            let rows = stmt.query_map([], map_entry_row).map_err(sqe)?;
            collect_rows(rows)
        }
    }
}

/// Entry points for a batch of symbol FQNs (single join against callers).
pub fn get_entry_points_for_fqns(
    conn: &Connection,
    fqns: &[String],
) -> Result<Vec<EntryPoint>, StorageError> {
    if fqns.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM entry_points WHERE symbol_fqn IN ({})",
        placeholders(fqns.len())
    );
    let mut stmt = conn.prepare(&sql).map_err(sqe)?;
    let rows = stmt
        .query_map(params_from_iter(fqns.iter()), map_entry_row)
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Total entry point count.
pub fn count_entry_points(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM entry_points", [], |row| row.get(0))
        .map_err(sqe)
}
