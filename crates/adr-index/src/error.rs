// error.rs — Error types for the semantic index.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or querying the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A file I/O operation on an index artifact failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An index record could not be serialized.
    #[error("serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// An artifact exists but its contents are unusable.
    #[error("corrupt index artifact {path}: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    /// The embedder could not produce a vector for some text.
    #[error("embedding failed: {reason}")]
    EmbeddingFailed { reason: String },

    /// The embedder returned a vector of the wrong length.
    #[error("embedder returned {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
