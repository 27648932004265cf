//! Storage-layer errors for SQLite and vector-store operations.

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Migration failed at version {version}: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("Database busy (another operation in progress)")]
    DbBusy,

    #[error("Database corrupt: {details}")]
    DbCorrupt { details: String },

    #[error("Vector store error: {message}")]
    VectorStore { message: String },

    #[error("Swap failed: {message}")]
    SwapFailed { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Wrap any displayable error as a SQLite-plane error.
    pub fn sqlite(e: impl std::fmt::Display) -> Self {
        Self::SqliteError {
            message: e.to_string(),
        }
    }

    /// Wrap any displayable error as a vector-plane error.
    pub fn vector(e: impl std::fmt::Display) -> Self {
        Self::VectorStore {
            message: e.to_string(),
        }
    }
}
