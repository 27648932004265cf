//! summaries table queries.

use rusqlite::{params, params_from_iter, Connection};

use ariadne_core::models::{Summary, SummaryLevel};
use ariadne_core::StorageError;

use crate::sqe;

use super::{collect_rows, placeholders};

/// A summary row as stored, with freshness metadata.
#[derive(Debug, Clone)]
pub struct SummaryRecord {
    pub id: i64,
    pub target_fqn: String,
    pub level: SummaryLevel,
    pub summary: String,
    pub vector_id: Option<String>,
    pub is_stale: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

const SUMMARY_COLUMNS: &str =
    "id, target_fqn, level, summary, vector_id, is_stale, created_at, updated_at";

fn map_summary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SummaryRecord> {
    let level: String = row.get(2)?;
    Ok(SummaryRecord {
        id: row.get(0)?,
        target_fqn: row.get(1)?,
        level: SummaryLevel::parse(&level).unwrap_or(SummaryLevel::Method),
        summary: row.get(3)?,
        vector_id: row.get(4)?,
        is_stale: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Upsert keyed on `target_fqn`; refreshes text, vector id, staleness and
/// `updated_at`.
pub fn upsert_summary(conn: &Connection, summary: &Summary) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO summaries (target_fqn, level, summary, vector_id, is_stale)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(target_fqn) DO UPDATE SET
         summary = excluded.summary,
         vector_id = excluded.vector_id,
         is_stale = excluded.is_stale,
         updated_at = CURRENT_TIMESTAMP",
        params![
            summary.target_fqn,
            summary.level.as_str(),
            summary.summary,
            summary.vector_id,
            summary.is_stale,
        ],
    )
    .map_err(sqe)?;
    Ok(())
}

/// Get a summary by target FQN, optional level filter.
pub fn get_summary(
    conn: &Connection,
    target_fqn: &str,
    level: Option<SummaryLevel>,
) -> Result<Option<SummaryRecord>, StorageError> {
    let result = match level {
        Some(level) => conn
            .query_row(
                &format!(
                    "SELECT {SUMMARY_COLUMNS} FROM summaries WHERE target_fqn = ?1 AND level = ?2"
                ),
                params![target_fqn, level.as_str()],
                map_summary_row,
            ),
        None => conn.query_row(
            &format!("SELECT {SUMMARY_COLUMNS} FROM summaries WHERE target_fqn = ?1"),
            params![target_fqn],
            map_summary_row,
        ),
    };
    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(sqe(e)),
    }
}

/// Single-statement batch stale-marking. Flips exactly
/// `|fqns ∩ existing summaries|` rows; returns that count.
pub fn mark_summaries_stale(conn: &Connection, fqns: &[String]) -> Result<usize, StorageError> {
    if fqns.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "UPDATE summaries SET is_stale = 1, updated_at = CURRENT_TIMESTAMP
         WHERE target_fqn IN ({})",
        placeholders(fqns.len())
    );
    conn.execute(&sql, params_from_iter(fqns.iter())).map_err(sqe)
}

/// Summaries currently marked stale, capped.
pub fn get_stale_summaries(
    conn: &Connection,
    limit: i64,
) -> Result<Vec<SummaryRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM summaries WHERE is_stale = 1 LIMIT ?1"
        ))
        .map_err(sqe)?;
    let rows = stmt.query_map(params![limit], map_summary_row).map_err(sqe)?;
    collect_rows(rows)
}

/// Freshness lookup for a batch: `(target_fqn, is_stale)` pairs.
pub fn get_staleness(
    conn: &Connection,
    fqns: &[String],
) -> Result<Vec<(String, bool)>, StorageError> {
    if fqns.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT target_fqn, is_stale FROM summaries WHERE target_fqn IN ({})",
        placeholders(fqns.len())
    );
    let mut stmt = conn.prepare(&sql).map_err(sqe)?;
    let rows = stmt
        .query_map(params_from_iter(fqns.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Set the vector id and clear staleness (vector plane caught up).
pub fn update_vector_id(
    conn: &Connection,
    target_fqn: &str,
    vector_id: &str,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE summaries SET vector_id = ?1, is_stale = 0 WHERE target_fqn = ?2",
        params![vector_id, target_fqn],
    )
    .map_err(sqe)?;
    Ok(())
}

/// All summaries of a level.
pub fn get_summaries_by_level(
    conn: &Connection,
    level: SummaryLevel,
) -> Result<Vec<SummaryRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM summaries WHERE level = ?1"
        ))
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![level.as_str()], map_summary_row)
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Total summary count.
pub fn count_summaries(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM summaries", [], |row| row.get(0))
        .map_err(sqe)
}

/// Summaries whose vector_id is set (for orphan detection).
pub fn summaries_with_vectors(
    conn: &Connection,
) -> Result<Vec<(String, String)>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT target_fqn, vector_id FROM summaries WHERE vector_id IS NOT NULL",
        )
        .map_err(sqe)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(sqe)?;
    collect_rows(rows)
}
