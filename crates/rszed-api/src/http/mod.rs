//! HTTP API endpoints.
//!
//! | Endpoint       | Method | Description                               |
//! |----------------|--------|-------------------------------------------|
//! | `/v1/watch`    | POST   | Stream tuple changes as NDJSON            |
//! | `/v1/tuples`   | POST   | Write tuple updates                       |
//! | `/v1/revision` | GET    | Current revision token                    |
//! | `/health`      | GET    | Liveness check                            |
//!
//! A watch stream writes one JSON `WatchResponse` per line. If the watch
//! fails after streaming has begun, the last line is
//! `{"error":{"code":"...","message":"..."}}`.

pub mod routes;
pub mod state;

pub use routes::{create_router, create_router_with_body_limit, ApiError, DEFAULT_BODY_LIMIT};
pub use state::AppState;
