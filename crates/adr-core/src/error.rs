// error.rs — Error types for the decision store and project configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing decision records.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not a well-formed decision record.
    #[error("failed to parse decision at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    /// Front matter could not be rendered back to YAML.
    #[error("failed to serialize front matter: {0}")]
    SerializeError(#[from] serde_yaml::Error),

    /// `.adr/config.toml` exists but is not valid.
    #[error("invalid project config at {path}: {source}")]
    ConfigError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// No decision with the given ID exists in the store.
    #[error("decision not found: {0}")]
    NotFound(String),
}
