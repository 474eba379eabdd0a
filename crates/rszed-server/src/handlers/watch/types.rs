//! Types for watch requests, responses and outcomes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rszed_domain::model::TupleUpdate;
use rszed_storage::StorageError;

/// A request to stream tuple mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRequest {
    /// Namespaces to receive updates for. Must not be empty.
    pub namespaces: Vec<String>,
    /// Opaque checkpoint to resume after. Absent or empty means "now".
    #[serde(default)]
    pub start_token: Option<String>,
}

/// One forwarded batch of updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchResponse {
    /// Filtered updates, in commit order. Never empty.
    pub updates: Vec<TupleUpdate>,
    /// Checkpoint for the end of the batch, usable as a later `start_token`.
    pub end_token: String,
}

/// Protocol-agnostic outcome codes for a failed watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchErrorCode {
    InvalidArgument,
    Unavailable,
    Canceled,
    ResourceExhausted,
    Internal,
}

impl WatchErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchErrorCode::InvalidArgument => "invalid_argument",
            WatchErrorCode::Unavailable => "unavailable",
            WatchErrorCode::Canceled => "canceled",
            WatchErrorCode::ResourceExhausted => "resource_exhausted",
            WatchErrorCode::Internal => "internal",
        }
    }
}

/// Terminal failure of a watch call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatchError {
    /// Bad request or undecodable start token. The feed was never opened.
    #[error("{0}")]
    InvalidArgument(String),

    /// The start revision could not be resolved. The feed was never opened.
    #[error("{0}")]
    Unavailable(String),

    /// The caller or an administrator stopped the watch.
    #[error("{0}")]
    Canceled(String),

    /// The watcher could not keep up with the change feed.
    #[error("{0}")]
    ResourceExhausted(String),

    /// Any other feed failure.
    #[error("{0}")]
    Internal(String),
}

impl WatchError {
    pub fn code(&self) -> WatchErrorCode {
        match self {
            WatchError::InvalidArgument(_) => WatchErrorCode::InvalidArgument,
            WatchError::Unavailable(_) => WatchErrorCode::Unavailable,
            WatchError::Canceled(_) => WatchErrorCode::Canceled,
            WatchError::ResourceExhausted(_) => WatchErrorCode::ResourceExhausted,
            WatchError::Internal(_) => WatchErrorCode::Internal,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            WatchError::InvalidArgument(msg)
            | WatchError::Unavailable(msg)
            | WatchError::Canceled(msg)
            | WatchError::ResourceExhausted(msg)
            | WatchError::Internal(msg) => msg,
        }
    }
}

/// Translates a change feed error into the watch outcome.
pub fn classify_feed_error(err: StorageError) -> WatchError {
    match err {
        StorageError::WatchCanceled => {
            WatchError::Canceled(format!("watch canceled by user: {err}"))
        }
        StorageError::WatchDisconnected => {
            WatchError::ResourceExhausted(format!("watch disconnected: {err}"))
        }
        other => WatchError::Internal(format!("watch error: {other}")),
    }
}

/// Result type for watch operations.
pub type WatchResult<T> = Result<T, WatchError>;
