// error.rs — Error types for guard analysis.

use adr_core::CoreError;
use adr_index::IndexError;
use thiserror::Error;

/// Failures that stop an analysis. Problems confined to one hunk, one
/// decision file, or one query are reported as notices instead.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("diff is {size} bytes, over the {limit} byte limit")]
    DiffTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Store(#[from] CoreError),

    #[error(transparent)]
    Index(#[from] IndexError),
}
