//! Shared error translation for the API layers.
//!
//! Watch outcomes are classified once, in the server crate, as a
//! protocol-agnostic [`WatchErrorCode`]. This module maps that code onto
//! gRPC status codes and HTTP status codes so both transports agree.
//!
//! | Watch code          | gRPC                 | HTTP |
//! |---------------------|----------------------|------|
//! | `InvalidArgument`   | `INVALID_ARGUMENT`   | 400  |
//! | `Unavailable`       | `UNAVAILABLE`        | 503  |
//! | `Canceled`          | `CANCELLED`          | 499  |
//! | `ResourceExhausted` | `RESOURCE_EXHAUSTED` | 429  |
//! | `Internal`          | `INTERNAL`           | 500  |

use axum::http::StatusCode;
use tonic::Status;

use rszed_server::handlers::watch::{WatchError, WatchErrorCode};
use rszed_storage::StorageError;

/// Non-standard "client closed request" status, as used by nginx.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Converts a watch outcome into a gRPC status.
pub fn watch_error_to_status(err: WatchError) -> Status {
    let message = err.message().to_string();
    match err.code() {
        WatchErrorCode::InvalidArgument => Status::invalid_argument(message),
        WatchErrorCode::Unavailable => Status::unavailable(message),
        WatchErrorCode::Canceled => Status::cancelled(message),
        WatchErrorCode::ResourceExhausted => Status::resource_exhausted(message),
        WatchErrorCode::Internal => Status::internal(message),
    }
}

/// Converts a watch outcome into an HTTP status code.
pub fn watch_error_to_http(err: &WatchError) -> StatusCode {
    match err.code() {
        WatchErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        WatchErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        WatchErrorCode::Canceled => {
            StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
        }
        WatchErrorCode::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        WatchErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts a storage write failure into an HTTP status code.
pub fn storage_error_to_http(err: &StorageError) -> StatusCode {
    match err {
        StorageError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        StorageError::DuplicateTuple { .. } => StatusCode::CONFLICT,
        StorageError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
