//! index_metadata key-value queries (module content hashes and other
//! indexer bookkeeping).

use rusqlite::{params, Connection};

use ariadne_core::StorageError;

use crate::sqe;

/// Get a metadata value by key.
pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>, StorageError> {
    let result = conn.query_row(
        "SELECT value FROM index_metadata WHERE key = ?1",
        params![key],
        |row| row.get(0),
    );
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(sqe(e)),
    }
}

/// Set a metadata key-value pair.
pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<(), StorageError> {
    conn.execute(
        "INSERT OR REPLACE INTO index_metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )
    .map_err(sqe)?;
    Ok(())
}
