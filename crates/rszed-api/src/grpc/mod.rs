//! gRPC watch service.
//!
//! Exposes the watch controller with Tonic's request, response and status
//! types. The response is a server stream of `Result<WatchResponse, Status>`
//! items; a failed watch ends with a single `Err(status)` item.
//!
//! The service is not mounted by the `rszed` binary. Embedders call
//! [`WatchGrpcService::watch`] from their own tonic server.
//!
//! ```text
//! Request<WatchRequest> → WatchGrpcService → WatchHandler → ReceiverStream
//! ```

mod service;

pub use service::{WatchGrpcService, WatchResponseStream, DEFAULT_RESPONSE_BUFFER};
