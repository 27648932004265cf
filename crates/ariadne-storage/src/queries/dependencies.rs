//! external_dependencies table queries.

use rusqlite::{params, Connection};

use ariadne_core::models::{DependencyStrength, DependencyType, ExternalDependency};
use ariadne_core::StorageError;

use crate::sqe;

use super::collect_rows;

/// Batched insert, deduplicated by `(caller, type, target)` at insert time
/// so re-ingestion does not multiply rows.
pub fn insert_external_dependencies(
    conn: &Connection,
    deps: &[ExternalDependency],
) -> Result<usize, StorageError> {
    if deps.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction().map_err(sqe)?;
    {
        let mut stmt = tx
            .prepare_cached(
                "INSERT INTO external_dependencies (caller_fqn, dependency_type, target, strength)
                 SELECT ?1, ?2, ?3, ?4
                 WHERE NOT EXISTS (
                     SELECT 1 FROM external_dependencies
                     WHERE caller_fqn = ?1 AND dependency_type = ?2 AND target = ?3
                 )",
            )
            .map_err(sqe)?;
        for d in deps {
            stmt.execute(params![
                d.caller_fqn,
                d.dependency_type.as_str(),
                d.target,
                d.strength.as_str(),
            ])
            .map_err(sqe)?;
        }
    }
    tx.commit().map_err(sqe)?;
    Ok(deps.len())
}

fn map_dep_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExternalDependency> {
    let dep_type: String = row.get(1)?;
    let strength: String = row.get(3)?;
    Ok(ExternalDependency {
        caller_fqn: row.get(0)?,
        dependency_type: DependencyType::parse(&dep_type).unwrap_or(DependencyType::Http),
        target: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        strength: DependencyStrength::parse(&strength),
    })
}

const DEP_COLUMNS: &str = "caller_fqn, dependency_type, target, strength";

/// External dependencies with optional caller / type filters.
pub fn get_external_dependencies(
    conn: &Connection,
    caller_fqn: Option<&str>,
    dependency_type: Option<DependencyType>,
) -> Result<Vec<ExternalDependency>, StorageError> {
    match (caller_fqn, dependency_type) {
        (Some(caller), Some(t)) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {DEP_COLUMNS} FROM external_dependencies
                     WHERE caller_fqn = ?1 AND dependency_type = ?2"
                ))
                .map_err(sqe)?;
            let rows = stmt
                .query_map(params![caller, t.as_str()], map_dep_row)
                .map_err(sqe)?;
            collect_rows(rows)
        }
        (Some(caller), None) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {DEP_COLUMNS} FROM external_dependencies WHERE caller_fqn = ?1"
                ))
                .map_err(sqe)?;
            let rows = stmt.query_map(params![caller], map_dep_row).map_err(sqe)?;
            collect_rows(rows)
        }
        (None, Some(t)) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {DEP_COLUMNS} FROM external_dependencies WHERE dependency_type = ?1"
                ))
                .map_err(sqe)?;
            let rows = stmt
                .query_map(params![t.as_str()], map_dep_row)
                .map_err(sqe)?;
            collect_rows(rows)
        }
        (None, None) => {
            let mut stmt = conn
                .prepare_cached(&format!("SELECT {DEP_COLUMNS} FROM external_dependencies"))
                .map_err(sqe)?;
            let rows = stmt.query_map([], map_dep_row).map_err(sqe)?;
            collect_rows(rows)
        }
    }
}

/// Total external dependency count.
pub fn count_external_dependencies(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM external_dependencies", [], |row| row.get(0))
        .map_err(sqe)
}
