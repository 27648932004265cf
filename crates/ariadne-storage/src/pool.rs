//! Connection pool: one writer + N read-only connections, round-robin
//! reader selection.
//!
//! Connections are never shared across threads concurrently — each lives
//! behind its own mutex, and worker threads borrow one for the duration of
//! a closure. The only place allowed to hold a raw `Connection` outside
//! this module is an auxiliary connection explicitly opened for
//! orphan-tracking writes (see `dual_write`).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};

use ariadne_core::StorageError;

use crate::pragmas::{configure_connection, configure_readonly_connection};
use crate::sqe;

/// Default number of reader connections.
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

/// 1 writer + N readers over a single SQLite file (WAL mode).
pub struct ConnectionPool {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    read_index: AtomicUsize,
    path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open a file-backed pool. WAL + PRAGMAs applied to every connection.
    pub fn open(path: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        let pool_size = if read_pool_size == 0 {
            DEFAULT_READ_POOL_SIZE
        } else {
            read_pool_size
        };

        let writer = Connection::open(path).map_err(sqe)?;
        configure_connection(&writer)?;

        let mut readers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(sqe)?;
            configure_readonly_connection(&reader)?;
            readers.push(Mutex::new(reader));
        }

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            read_index: AtomicUsize::new(0),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory pool (tests). Readers are empty; `with_reader`
    /// falls back to the single writer connection, so all operations share
    /// one connection and see each other's writes.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(sqe)?;
        configure_connection(&writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            read_index: AtomicUsize::new(0),
            path: None,
        })
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Execute a closure with the writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| StorageError::sqlite(format!("writer lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Execute a closure with a reader connection (round-robin).
    /// Falls back to the writer when no readers exist (in-memory mode).
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        if self.readers.is_empty() {
            return self.with_writer(f);
        }

        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[index]
            .lock()
            .map_err(|e| StorageError::sqlite(format!("reader lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Open an extra read-write connection to the same file.
    /// Used for connection-scoped transactions that must survive a rollback
    /// of the main writer's transaction. Not available in-memory.
    pub fn open_aux_connection(&self) -> Result<Option<Connection>, StorageError> {
        match &self.path {
            Some(path) => {
                let conn = Connection::open(path).map_err(sqe)?;
                configure_connection(&conn)?;
                Ok(Some(conn))
            }
            None => Ok(None),
        }
    }

    /// Force a WAL checkpoint on the writer.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(sqe)
        })
    }
}
