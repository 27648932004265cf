//! glossary table queries.

use rusqlite::{params, Connection};

use ariadne_core::models::GlossaryEntry;
use ariadne_core::StorageError;

use crate::sqe;

use super::{collect_rows, decode_list, encode_list};

/// A glossary row with its primary key (the vector-store join id).
#[derive(Debug, Clone)]
pub struct GlossaryRecord {
    pub id: i64,
    pub entry: GlossaryEntry,
}

const GLOSSARY_COLUMNS: &str =
    "id, code_term, business_meaning, synonyms, source_fqn, vector_id";

fn map_glossary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GlossaryRecord> {
    Ok(GlossaryRecord {
        id: row.get(0)?,
        entry: GlossaryEntry {
            code_term: row.get(1)?,
            business_meaning: row.get(2)?,
            synonyms: decode_list(row.get(3)?),
            source_fqn: row.get(4)?,
            vector_id: row.get(5)?,
        },
    })
}

/// Upsert keyed on `code_term`. Returns the row id.
pub fn upsert_glossary_entry(
    conn: &Connection,
    entry: &GlossaryEntry,
) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO glossary (code_term, business_meaning, synonyms, source_fqn, vector_id)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(code_term) DO UPDATE SET
         business_meaning = excluded.business_meaning,
         synonyms = excluded.synonyms,
         source_fqn = excluded.source_fqn,
         vector_id = excluded.vector_id",
        params![
            entry.code_term,
            entry.business_meaning,
            encode_list(&entry.synonyms),
            entry.source_fqn,
            entry.vector_id,
        ],
    )
    .map_err(sqe)?;

    conn.query_row(
        "SELECT id FROM glossary WHERE code_term = ?1",
        params![entry.code_term],
        |row| row.get(0),
    )
    .map_err(sqe)
}

/// Get an entry by code term.
pub fn get_glossary_entry(
    conn: &Connection,
    code_term: &str,
) -> Result<Option<GlossaryRecord>, StorageError> {
    let result = conn.query_row(
        &format!("SELECT {GLOSSARY_COLUMNS} FROM glossary WHERE code_term = ?1"),
        params![code_term],
        map_glossary_row,
    );
    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(sqe(e)),
    }
}

/// Get an entry by row id (hydration after vector search).
pub fn get_glossary_by_id(
    conn: &Connection,
    id: i64,
) -> Result<Option<GlossaryRecord>, StorageError> {
    let result = conn.query_row(
        &format!("SELECT {GLOSSARY_COLUMNS} FROM glossary WHERE id = ?1"),
        params![id],
        map_glossary_row,
    );
    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(sqe(e)),
    }
}

/// Substring search over term and meaning, capped at 100.
pub fn search_glossary(
    conn: &Connection,
    pattern: &str,
) -> Result<Vec<GlossaryRecord>, StorageError> {
    let like = format!("%{pattern}%");
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {GLOSSARY_COLUMNS} FROM glossary
             WHERE code_term LIKE ?1 OR business_meaning LIKE ?1 LIMIT 100"
        ))
        .map_err(sqe)?;
    let rows = stmt.query_map(params![like], map_glossary_row).map_err(sqe)?;
    collect_rows(rows)
}

/// All entries sourced from a symbol.
pub fn get_glossary_by_source(
    conn: &Connection,
    source_fqn: &str,
) -> Result<Vec<GlossaryRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {GLOSSARY_COLUMNS} FROM glossary WHERE source_fqn = ?1"
        ))
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![source_fqn], map_glossary_row)
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Set the vector id after the vector plane accepted the entry.
pub fn update_glossary_vector_id(
    conn: &Connection,
    code_term: &str,
    vector_id: &str,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE glossary SET vector_id = ?1 WHERE code_term = ?2",
        params![vector_id, code_term],
    )
    .map_err(sqe)?;
    Ok(())
}

/// Total glossary entry count.
pub fn count_glossary(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM glossary", [], |row| row.get(0))
        .map_err(sqe)
}
