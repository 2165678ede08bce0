// error.rs — Error types for policy extraction and preflight.

use thiserror::Error;

/// Errors that can occur during policy operations.
///
/// Extraction itself never fails; ambiguity is reported as a warning.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The preflight choice is empty or is not a package-like name.
    #[error("invalid technical choice '{choice}': {reason}")]
    InvalidChoice { choice: String, reason: String },
}
