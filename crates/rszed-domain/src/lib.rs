//! rszed-domain: Core domain logic
//!
//! This crate contains:
//! - Relation tuple model and change batches
//! - Revisions and the opaque revision token codec
//! - Canonical dispatch cache key derivation
//! - Dispatch result caching
//! - Namespace filtering for watch streams
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                rszed-domain                  │
//! ├─────────────────────────────────────────────┤
//! │  model/     - Tuples, updates, batches      │
//! │  revision   - Revisions & zookie codec      │
//! │  dispatch/  - Request shapes & cache keys   │
//! │  cache/     - Dispatch result caching       │
//! │  watch/     - Namespace filter              │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod revision;
pub mod watch;

// Re-export commonly used types at the crate root
pub use cache::{DispatchCache, DispatchCacheConfig};
pub use dispatch::{CacheKeyed, DispatchCacheKey};
pub use error::{DomainError, DomainResult};
pub use revision::{Revision, RevisionCodec, ZookieCodec};
pub use watch::NamespaceFilter;
