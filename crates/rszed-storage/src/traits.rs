//! Datastore trait definition.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rszed_domain::model::{ChangeBatch, TupleUpdate};
use rszed_domain::Revision;

use crate::error::{StorageError, StorageResult};

/// The two halves of an open change feed.
///
/// `changes` yields batches strictly after the starting revision, in
/// revision order. `errors` yields at most one error, after which both
/// channels close. A feed canceled through its token reports
/// [`StorageError::WatchCanceled`]; a subscriber that falls behind gets
/// [`StorageError::WatchDisconnected`].
#[derive(Debug)]
pub struct WatchFeed {
    pub changes: mpsc::Receiver<ChangeBatch>,
    pub errors: mpsc::Receiver<StorageError>,
}

/// Abstract storage interface for relation tuples.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations.
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    /// Returns the latest committed revision.
    async fn current_revision(&self) -> StorageResult<Revision>;

    /// Opens a change feed starting strictly after `after`.
    ///
    /// The feed runs until `cancel` fires, an error occurs, or both
    /// receivers of the returned [`WatchFeed`] are dropped. Must be called
    /// from within a Tokio runtime.
    fn watch(&self, after: Revision, cancel: CancellationToken) -> WatchFeed;

    /// Applies `updates` atomically and returns the revision they were committed at.
    async fn write_tuples(&self, updates: Vec<TupleUpdate>) -> StorageResult<Revision>;
}
