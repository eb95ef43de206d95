//! Error types for the synchronization core
//!
//! Algebra failures (`LengthMismatch`, `CorruptOperation`) are programming or
//! desync errors. The session escalates them to [`SyncError::Desync`], after
//! which the document has to be reloaded from the server.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors produced by the operation algebra, the translator and the session
#[derive(Debug, Error)]
pub enum SyncError {
    /// An algebra precondition on operation lengths was violated
    #[error("{operation}: length mismatch (expected {expected}, got {actual})")]
    LengthMismatch {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A payload or an operation does not describe a consistent edit
    #[error("corrupt operation: {0}")]
    CorruptOperation(String),

    /// An acknowledgment arrived while nothing was in flight
    #[error("acknowledgment received while no operation is in flight")]
    UnexpectedAck,

    /// The server document cannot place an operation at this revision
    #[error("invalid revision {revision} (document is at {current})")]
    InvalidRevision { revision: u64, current: u64 },

    /// The local buffer diverged from the shared document
    #[error("desynchronized: {0}")]
    Desync(String),

    /// Session configuration rejected by validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Whether the error leaves the session unable to continue
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::UnexpectedAck | SyncError::InvalidConfig(_))
    }

    /// Escalate to a desync, keeping an existing desync untouched
    pub fn into_desync(self) -> SyncError {
        match self {
            SyncError::Desync(reason) => SyncError::Desync(reason),
            other => SyncError::Desync(other.to_string()),
        }
    }
}
