//! anti_patterns table queries.

use rusqlite::{params, Connection};

use ariadne_core::models::{AntiPattern, Severity};
use ariadne_core::StorageError;

use crate::sqe;

use super::collect_rows;

/// A stored detection with its timestamp.
#[derive(Debug, Clone)]
pub struct AntiPatternRecord {
    pub id: i64,
    pub pattern: AntiPattern,
    pub detected_at: Option<String>,
}

const AP_COLUMNS: &str = "id, rule_id, from_fqn, to_fqn, severity, message, detected_at";

fn map_ap_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AntiPatternRecord> {
    let severity: String = row.get(4)?;
    Ok(AntiPatternRecord {
        id: row.get(0)?,
        pattern: AntiPattern {
            rule_id: row.get(1)?,
            from_fqn: row.get(2)?,
            to_fqn: row.get(3)?,
            severity: Severity::parse(&severity).unwrap_or(Severity::Info),
            message: row.get(5)?,
        },
        detected_at: row.get(6)?,
    })
}

/// Batched insert of detections. Single transaction.
pub fn insert_anti_patterns(
    conn: &Connection,
    patterns: &[AntiPattern],
) -> Result<usize, StorageError> {
    if patterns.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction().map_err(sqe)?;
    {
        let mut stmt = tx
            .prepare_cached(
                "INSERT INTO anti_patterns (rule_id, from_fqn, to_fqn, severity, message)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(sqe)?;
        for p in patterns {
            stmt.execute(params![
                p.rule_id,
                p.from_fqn,
                p.to_fqn,
                p.severity.as_str(),
                p.message,
            ])
            .map_err(sqe)?;
        }
    }
    tx.commit().map_err(sqe)?;
    Ok(patterns.len())
}

/// Detections with optional rule / severity filters.
pub fn get_anti_patterns(
    conn: &Connection,
    rule_id: Option<&str>,
    severity: Option<Severity>,
) -> Result<Vec<AntiPatternRecord>, StorageError> {
    match (rule_id, severity) {
        (Some(rule), Some(sev)) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {AP_COLUMNS} FROM anti_patterns WHERE rule_id = ?1 AND severity = ?2"
                ))
                .map_err(sqe)?;
            let rows = stmt
                .query_map(params![rule, sev.as_str()], map_ap_row)
                .map_err(sqe)?;
            collect_rows(rows)
        }
        (Some(rule), None) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {AP_COLUMNS} FROM anti_patterns WHERE rule_id = ?1"
                ))
                .map_err(sqe)?;
            let rows = stmt.query_map(params![rule], map_ap_row).map_err(sqe)?;
            collect_rows(rows)
        }
        (None, Some(sev)) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {AP_COLUMNS} FROM anti_patterns WHERE severity = ?1"
                ))
                .map_err(sqe)?;
            let rows = stmt
                .query_map(params![sev.as_str()], map_ap_row)
                .map_err(sqe)?;
            collect_rows(rows)
        }
        (None, None) => {
            let mut stmt = conn
                .prepare_cached(&format!("SELECT {AP_COLUMNS} FROM anti_patterns"))
                .map_err(sqe)?;
            let rows = stmt.query_map([], map_ap_row).map_err(sqe)?;
            collect_rows(rows)
        }
    }
}

/// Delete all stored detections; returns how many were removed.
pub fn clear_anti_patterns(conn: &Connection) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM anti_patterns", []).map_err(sqe)
}
