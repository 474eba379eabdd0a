//! Observability setup for rszed.
//!
//! Structured logging through `tracing-subscriber`, configured from the
//! server's `logging` settings.

mod logging;

pub use logging::{create_json_layer, init_logging, parse_log_level, LoggingConfig};
