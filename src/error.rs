//! Error types for the backup engine.

use thiserror::Error;

/// Main error type for all store and orchestration operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("chunk not found: {hash}")]
    ChunkMissing { hash: String },

    #[error("chunk corrupted: stored bytes under {hash} do not hash to that digest")]
    ChunkCorrupted { hash: String },

    #[error("manifest corrupted: {reason}")]
    ManifestCorrupted { reason: String },

    #[error("merkle root mismatch: expected {expected}, recomputed {actual}")]
    MerkleMismatch { expected: String, actual: String },

    #[error("rollback detected: {reason}")]
    RollbackDetected { reason: String },

    #[error("permission denied: user '{user}' may not run '{command}'")]
    PermissionDenied { user: String, command: String },

    #[error("journal corrupted: {reason}")]
    JournalCorrupted { reason: String },

    #[error("audit log corrupted at line {line}")]
    AuditCorrupted { line: usize },

    #[error("snapshot not found: {id}")]
    SnapshotNotFound { id: String },

    #[error("could not determine the invoking user")]
    Identity,

    #[error("invalid store layout: {reason}")]
    InvalidStore { reason: String },
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
