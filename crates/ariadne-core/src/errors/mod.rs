//! Error taxonomy for the Ariadne service.

pub mod storage_error;

pub use storage_error::StorageError;

use thiserror::Error;

/// Service-level errors. Kinds, not transport types — the HTTP boundary
/// translates these into RFC-7807 problem envelopes (see [`crate::problem`]).
#[derive(Error, Debug)]
pub enum AriadneError {
    #[error("Not found: {kind} '{id}'")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unavailable: {service}: {reason}")]
    Unavailable { service: &'static str, reason: String },

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Rebuild failed: {0}")]
    RebuildFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transient failure after {attempts} attempts: {reason}")]
    Transient { attempts: u32, reason: String },

    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AriadneResult<T> = Result<T, AriadneError>;

impl AriadneError {
    /// Stable problem-type slug for the RFC-7807 envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not-found",
            Self::InvalidArgument(_) => "invalid-argument",
            Self::Unavailable { .. } => "unavailable",
            Self::Integrity(_) => "integrity-error",
            Self::RebuildFailed(_) => "rebuild-failed",
            Self::Conflict(_) => "conflict",
            Self::Transient { .. } => "transient",
            Self::Fatal(_) => "fatal",
            Self::Storage(_) => "storage-error",
            Self::Serialization(_) => "serialization-error",
        }
    }

    /// HTTP status the boundary maps this kind onto.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::InvalidArgument(_) | Self::Serialization(_) => 400,
            Self::Conflict(_) => 409,
            Self::Unavailable { .. } | Self::Transient { .. } => 503,
            Self::Integrity(_)
            | Self::RebuildFailed(_)
            | Self::Fatal(_)
            | Self::Storage(_) => 500,
        }
    }
}
