//! Error taxonomy for the sync engine.
//!
//! Conflicts and already-in-sync skips are not errors; they are reported as
//! [`crate::transfer::TransferOutcome`] values. Everything here aborts the
//! current single-file operation. Batch loops catch per-item errors and keep
//! going, so one failed file never takes down the rest of a transfer.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A local source or destination path does not exist.
    #[error("local file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A remote logical path resolved to nothing.
    #[error("remote path not found: {0}")]
    RemoteNotFound(String),

    /// The remote collaborator reported tampered or corrupt bytes. The
    /// tentative destination is discarded before this is raised.
    #[error("verification failed: {0}")]
    Verification(String),

    /// An upload never finalized on the remote side.
    #[error("node left in draft state after uploading {0}")]
    DraftState(String),

    /// The post-upload hash re-check disagreed with the hash that was
    /// uploaded. Indicates a remote-side defect; never silently retried.
    #[error("hash mismatch after uploading {path}: local {local} != remote {remote}")]
    IntegrityMismatch {
        path: String,
        local: String,
        remote: String,
    },

    /// A data-corruption or programming bug, e.g. an identity used as a
    /// cache key before its share component was backfilled.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An upload targeted an existing node that is not a file.
    #[error("destination is not a file: {0}")]
    NotAFile(String),

    /// The tree walker hit its depth guard, which only happens when the
    /// remote hands back a cyclic or absurdly deep structure.
    #[error("remote tree exceeds maximum depth of {0}")]
    DepthExceeded(usize),

    /// The operation was cancelled between I/O chunks or batch items.
    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("storage codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sled::transaction::TransactionError<SyncError>> for SyncError {
    fn from(err: sled::transaction::TransactionError<SyncError>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(e) => e,
            sled::transaction::TransactionError::Storage(e) => SyncError::Storage(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
