//! Error types for the store crate.

use thiserror::Error;

/// Errors that can occur in a task store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input rejected before touching storage.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote table answered with a non-success status.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// The remote table could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// Local database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be decoded.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Network(e.to_string())
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
