//! Store error types

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("database file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("database writer task is no longer running")]
    WriterGone,
}
