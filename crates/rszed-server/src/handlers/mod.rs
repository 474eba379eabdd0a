//! Request handlers.

pub mod watch;

pub use watch::{WatchError, WatchHandler, WatchRequest, WatchResponse};
