//! User store error types

use thiserror::Error;

/// Errors that can occur in the user store
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O operation failed (creating the data directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be decoded
    #[error("Corrupt record: {0}")]
    Corruption(String),

    /// Requested user does not exist
    #[error("User not found: {0}")]
    UserNotFound(i64),

    /// Connection mutex poisoned or blocking task panicked
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corruption(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::UserNotFound(42);
        assert_eq!(err.to_string(), "User not found: 42");
    }
}
