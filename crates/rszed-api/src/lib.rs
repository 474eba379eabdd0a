//! rszed-api: HTTP and gRPC API layer
//!
//! This crate provides the service boundary for watch streams:
//! - HTTP endpoints via Axum (NDJSON watch stream, tuple writes)
//! - A gRPC-style server-streaming watch service via Tonic types. The `rszed`
//!   binary serves HTTP only; embedders mount the gRPC service themselves.
//! - Error translation and logging setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 rszed-api                    │
//! ├─────────────────────────────────────────────┤
//! │  http/          - HTTP endpoints            │
//! │  grpc/          - Streaming watch service   │
//! │  streaming      - Subscription → transport  │
//! │  errors         - Status code mapping       │
//! │  observability/ - Logging setup             │
//! └─────────────────────────────────────────────┘
//! ```

pub mod errors;
pub mod grpc;
pub mod http;
pub mod observability;
pub mod streaming;
