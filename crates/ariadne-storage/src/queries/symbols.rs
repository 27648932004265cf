//! symbols table queries.

use rusqlite::{params, params_from_iter, Connection};

use ariadne_core::models::{Symbol, SymbolKind, SymbolRecord};
use ariadne_core::StorageError;

use crate::sqe;

use super::{collect_rows, decode_list, encode_list, placeholders};

/// Batched upsert keyed on `fqn`. Mutable fields refresh, `updated_at`
/// advances. Returns the number of rows written. Single transaction.
pub fn insert_symbols(conn: &Connection, symbols: &[Symbol]) -> Result<usize, StorageError> {
    if symbols.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction().map_err(sqe)?;
    {
        let mut stmt = tx
            .prepare_cached(
                "INSERT INTO symbols
                 (fqn, kind, name, file_path, line_number, modifiers, signature, parent_fqn, annotations)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(fqn) DO UPDATE SET
                 kind = excluded.kind,
                 name = excluded.name,
                 file_path = excluded.file_path,
                 line_number = excluded.line_number,
                 modifiers = excluded.modifiers,
                 signature = excluded.signature,
                 parent_fqn = excluded.parent_fqn,
                 annotations = excluded.annotations,
                 updated_at = CURRENT_TIMESTAMP",
            )
            .map_err(sqe)?;

        for s in symbols {
            stmt.execute(params![
                s.fqn,
                s.kind.as_str(),
                s.name,
                s.file_path,
                s.line_number,
                encode_list(&s.modifiers),
                s.signature,
                s.parent_fqn,
                encode_list(&s.annotations),
            ])
            .map_err(sqe)?;
        }
    }
    tx.commit().map_err(sqe)?;
    Ok(symbols.len())
}

const SYMBOL_COLUMNS: &str =
    "fqn, kind, name, file_path, line_number, modifiers, signature, parent_fqn, annotations,
     created_at, updated_at";

fn map_symbol_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SymbolRecord> {
    let kind_str: String = row.get(1)?;
    Ok(SymbolRecord {
        symbol: Symbol {
            fqn: row.get(0)?,
            kind: SymbolKind::parse(&kind_str).unwrap_or(SymbolKind::Class),
            name: row.get(2)?,
            file_path: row.get(3)?,
            line_number: row.get(4)?,
            modifiers: decode_list(row.get(5)?),
            signature: row.get(6)?,
            parent_fqn: row.get(7)?,
            annotations: decode_list(row.get(8)?),
        },
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Get a symbol by FQN.
pub fn get_symbol(conn: &Connection, fqn: &str) -> Result<Option<SymbolRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE fqn = ?1"))
        .map_err(sqe)?;
    let mut rows = stmt.query_map(params![fqn], map_symbol_row).map_err(sqe)?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(sqe)?)),
        None => Ok(None),
    }
}

/// Get all symbols of a given kind.
pub fn get_symbols_by_kind(
    conn: &Connection,
    kind: SymbolKind,
) -> Result<Vec<SymbolRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE kind = ?1"))
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![kind.as_str()], map_symbol_row)
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Get all symbols with a given parent FQN.
pub fn get_symbols_by_parent(
    conn: &Connection,
    parent_fqn: &str,
) -> Result<Vec<SymbolRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE parent_fqn = ?1"
        ))
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![parent_fqn], map_symbol_row)
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Batch fetch by FQN. One query regardless of set size.
pub fn get_symbols_by_fqns(
    conn: &Connection,
    fqns: &[String],
) -> Result<Vec<SymbolRecord>, StorageError> {
    if fqns.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE fqn IN ({})",
        placeholders(fqns.len())
    );
    let mut stmt = conn.prepare(&sql).map_err(sqe)?;
    let rows = stmt
        .query_map(params_from_iter(fqns.iter()), map_symbol_row)
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Substring search on the short name, optional kind filter, capped at 100.
pub fn search_symbols(
    conn: &Connection,
    name_pattern: &str,
    kind: Option<SymbolKind>,
) -> Result<Vec<SymbolRecord>, StorageError> {
    let like = format!("%{name_pattern}%");
    match kind {
        Some(kind) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE name LIKE ?1 AND kind = ?2 LIMIT 100"
                ))
                .map_err(sqe)?;
            let rows = stmt
                .query_map(params![like, kind.as_str()], map_symbol_row)
                .map_err(sqe)?;
            collect_rows(rows)
        }
        None => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE name LIKE ?1 LIMIT 100"
                ))
                .map_err(sqe)?;
            let rows = stmt.query_map(params![like], map_symbol_row).map_err(sqe)?;
            collect_rows(rows)
        }
    }
}

/// Total symbol count.
pub fn count_symbols(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM symbols", [], |row| row.get(0))
        .map_err(sqe)
}

/// Delete all symbols with the given file path. Cascade triggers clean up
/// edges and dependent rows. Returns the number of symbols deleted.
pub fn clean_by_file(conn: &Connection, file_path: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM symbols WHERE file_path = ?1", params![file_path])
        .map_err(sqe)
}

/// FQNs of all symbols in a file.
pub fn fqns_in_file(conn: &Connection, file_path: &str) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT fqn FROM symbols WHERE file_path = ?1")
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![file_path], |row| row.get(0))
        .map_err(sqe)?;
    collect_rows(rows)
}
