//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The watch was canceled by the caller or an administrator.
    #[error("watch canceled by user")]
    WatchCanceled,

    /// The watcher fell too far behind the change feed and was disconnected.
    #[error("watch disconnected: subscriber did not keep up with the change feed")]
    WatchDisconnected,

    /// A tuple created with CREATE already exists.
    #[error("duplicate tuple: {tuple}")]
    DuplicateTuple { tuple: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The backend cannot serve requests right now.
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    Internal { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
