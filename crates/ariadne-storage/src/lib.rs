//! # ariadne-storage
//!
//! Persistence layer for the Ariadne knowledge graph.
//! SQLite in WAL mode (single writer + read pool), cascade triggers for the
//! edge table, recursive CTE traversals, a companion vector store, the
//! dual-write coordinator that keeps both stores consistent, the shadow
//! rebuilder with atomic swap, and the rebuild job queue.

pub mod dual_write;
pub mod jobs;
pub mod migrations;
pub mod pool;
pub mod pragmas;
pub mod queries;
pub mod schema;
pub mod shadow;
pub mod store;
pub mod vector;

pub use dual_write::DualWriteCoordinator;
pub use jobs::JobQueue;
pub use pool::ConnectionPool;
pub use shadow::ShadowRebuilder;
pub use store::{Direction, GraphStore};
pub use vector::{Collection, VectorStore};

use ariadne_core::StorageError;

/// Helper: map a rusqlite error into the storage error type.
pub(crate) fn sqe(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}
