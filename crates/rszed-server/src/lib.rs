//! rszed-server: Request handlers and configuration
//!
//! This crate contains the service layer between the API surfaces and
//! storage:
//! - Watch handler streaming namespace-filtered tuple changes
//! - Configuration management
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rszed-server                   │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration management     │
//! │  handlers/   - Request handlers             │
//! │    watch/         - Watch streams           │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod handlers;

// Re-exports for convenience
pub use config::{ConfigLoadError, ServerConfig};
