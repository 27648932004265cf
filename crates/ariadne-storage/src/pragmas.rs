//! SQLite PRAGMA configuration.
//!
//! Must be applied to every connection immediately after opening.
//! The 30 s busy timeout is the primary concurrency mechanism: transient
//! contention retries inside SQLite rather than surfacing to callers.

use rusqlite::Connection;

use ariadne_core::StorageError;

use crate::sqe;

/// Configure a read-write connection.
///
/// - WAL for concurrent readers during writes
/// - enforced foreign keys (cascade deletes on the dependent tables)
/// - generous busy timeout so contention retries internally
pub fn configure_connection(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 30000;
        PRAGMA cache_size = -8000;
        PRAGMA mmap_size = 268435456;
        PRAGMA temp_store = MEMORY;
        ",
    )
    .map_err(sqe)
}

/// Configure a read-only connection. Same PRAGMAs plus `query_only` to
/// prevent accidental writes through this connection.
pub fn configure_readonly_connection(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 30000;
        PRAGMA cache_size = -8000;
        PRAGMA mmap_size = 268435456;
        PRAGMA temp_store = MEMORY;
        PRAGMA query_only = ON;
        ",
    )
    .map_err(sqe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_wal_mode() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        // In-memory databases report "memory" instead of "wal".
        assert!(
            journal_mode == "wal" || journal_mode == "memory",
            "expected wal or memory, got: {journal_mode}"
        );
    }

    #[test]
    fn sets_busy_timeout() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();

        let timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 30000);
    }

    #[test]
    fn sets_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();

        let fk: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn readonly_variant_applies() {
        let conn = Connection::open_in_memory().unwrap();
        configure_readonly_connection(&conn).unwrap();

        let timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 30000);
    }
}
