// error.rs — Error types for decision locking.

use std::path::PathBuf;
use thiserror::Error;

use adr_core::CoreError;

/// Errors that can occur while approving or verifying decisions.
#[derive(Debug, Error)]
pub enum LockError {
    /// Failed to read or write the lock store.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize a lock record or canonical form.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The lock store exists but cannot be parsed. Never replaced silently.
    #[error("lock store at {path} is unreadable: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    /// The decision's current on-disk form could not be loaded.
    #[error(transparent)]
    Decision(#[from] CoreError),
}
