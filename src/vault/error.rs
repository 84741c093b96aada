//! Error types for vault operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded")]
    QuotaExceeded,

    #[error("Store connection closed by a newer schema version")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Classify an I/O error, surfacing quota exhaustion as its own kind so
/// callers can show an actionable message.
pub(crate) fn classify_io(err: std::io::Error) -> StoreError {
    // ENOSPC on unix-likes
    if err.raw_os_error() == Some(28) {
        return StoreError::QuotaExceeded;
    }
    StoreError::Io(err)
}
