//! constraints table queries.

use rusqlite::{params, Connection};

use ariadne_core::models::{ConstraintEntry, ConstraintType};
use ariadne_core::StorageError;

use crate::sqe;

use super::collect_rows;

/// A constraint row with its primary key (the vector-store join id).
#[derive(Debug, Clone)]
pub struct ConstraintRecord {
    pub id: i64,
    pub entry: ConstraintEntry,
}

const CONSTRAINT_COLUMNS: &str =
    "id, name, description, source_fqn, source_line, constraint_type, vector_id";

fn map_constraint_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConstraintRecord> {
    let ctype: Option<String> = row.get(5)?;
    Ok(ConstraintRecord {
        id: row.get(0)?,
        entry: ConstraintEntry {
            name: row.get(1)?,
            description: row.get(2)?,
            source_fqn: row.get(3)?,
            source_line: row.get(4)?,
            constraint_type: ctype
                .as_deref()
                .and_then(ConstraintType::parse)
                .unwrap_or(ConstraintType::BusinessRule),
            vector_id: row.get(6)?,
        },
    })
}

/// Upsert keyed on `name`. Returns the row id.
pub fn upsert_constraint(
    conn: &Connection,
    entry: &ConstraintEntry,
) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO constraints (name, description, source_fqn, source_line, constraint_type, vector_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(name) DO UPDATE SET
         description = excluded.description,
         source_fqn = excluded.source_fqn,
         source_line = excluded.source_line,
         constraint_type = excluded.constraint_type,
         vector_id = excluded.vector_id",
        params![
            entry.name,
            entry.description,
            entry.source_fqn,
            entry.source_line,
            entry.constraint_type.as_str(),
            entry.vector_id,
        ],
    )
    .map_err(sqe)?;

    conn.query_row(
        "SELECT id FROM constraints WHERE name = ?1",
        params![entry.name],
        |row| row.get(0),
    )
    .map_err(sqe)
}

/// Get a constraint by name.
pub fn get_constraint(
    conn: &Connection,
    name: &str,
) -> Result<Option<ConstraintRecord>, StorageError> {
    let result = conn.query_row(
        &format!("SELECT {CONSTRAINT_COLUMNS} FROM constraints WHERE name = ?1"),
        params![name],
        map_constraint_row,
    );
    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(sqe(e)),
    }
}

/// Get a constraint by row id (hydration after vector search).
pub fn get_constraint_by_id(
    conn: &Connection,
    id: i64,
) -> Result<Option<ConstraintRecord>, StorageError> {
    let result = conn.query_row(
        &format!("SELECT {CONSTRAINT_COLUMNS} FROM constraints WHERE id = ?1"),
        params![id],
        map_constraint_row,
    );
    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(sqe(e)),
    }
}

/// All constraints of a type.
pub fn get_constraints_by_type(
    conn: &Connection,
    constraint_type: ConstraintType,
) -> Result<Vec<ConstraintRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {CONSTRAINT_COLUMNS} FROM constraints WHERE constraint_type = ?1"
        ))
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![constraint_type.as_str()], map_constraint_row)
        .map_err(sqe)?;
    collect_rows(rows)
}

/// All constraints sourced from a symbol.
pub fn get_constraints_by_source(
    conn: &Connection,
    source_fqn: &str,
) -> Result<Vec<ConstraintRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {CONSTRAINT_COLUMNS} FROM constraints WHERE source_fqn = ?1"
        ))
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![source_fqn], map_constraint_row)
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Substring search over name and description, capped at 100.
pub fn search_constraints(
    conn: &Connection,
    pattern: &str,
) -> Result<Vec<ConstraintRecord>, StorageError> {
    let like = format!("%{pattern}%");
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {CONSTRAINT_COLUMNS} FROM constraints
             WHERE name LIKE ?1 OR description LIKE ?1 LIMIT 100"
        ))
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![like], map_constraint_row)
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Set the vector id after the vector plane accepted the entry.
pub fn update_constraint_vector_id(
    conn: &Connection,
    name: &str,
    vector_id: &str,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE constraints SET vector_id = ?1 WHERE name = ?2",
        params![vector_id, name],
    )
    .map_err(sqe)?;
    Ok(())
}

/// Total constraint count.
pub fn count_constraints(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM constraints", [], |row| row.get(0))
        .map_err(sqe)
}
