//! rszed-storage: Storage abstraction layer
//!
//! This crate provides the storage abstraction for rszed, including:
//! - Datastore trait for revisions, writes and change feeds
//! - Sentinel errors distinguishing canceled and disconnected watches
//! - In-memory implementation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rszed-storage                  │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - Datastore trait definition   │
//! │  memory.rs   - In-memory implementation     │
//! │  error.rs    - Storage errors & sentinels   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryDataStore, MemoryDataStoreConfig};
pub use traits::{Datastore, WatchFeed};
