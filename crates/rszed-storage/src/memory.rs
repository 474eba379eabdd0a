//! In-memory storage implementation.
//!
//! Keeps the live tuple set, an append-only changelog of committed batches,
//! and a broadcast channel that fans new batches out to open watch feeds.
//!
//! Every write holds the state lock while it appends to the changelog and
//! broadcasts, and every feed subscribes to the broadcast while holding the
//! read lock. A feed therefore sees each batch exactly once: from its
//! changelog backlog or from the live broadcast, never neither.
//!
//! The changelog is never compacted, so memory grows with the number of
//! writes for the lifetime of the store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use rszed_domain::model::{ChangeBatch, RelationTuple, TupleUpdate, UpdateOperation};
use rszed_domain::Revision;

use crate::error::{StorageError, StorageResult};
use crate::traits::{Datastore, WatchFeed};

/// Tuning for the in-memory datastore's change feeds.
#[derive(Debug, Clone)]
pub struct MemoryDataStoreConfig {
    /// Capacity of each subscriber's batch channel.
    pub watch_buffer_length: usize,
    /// How long a feed waits on a full subscriber channel before disconnecting it.
    pub buffer_write_timeout: Duration,
    /// Capacity of the shared broadcast channel feeding all subscribers.
    pub broadcast_capacity: usize,
}

impl Default for MemoryDataStoreConfig {
    fn default() -> Self {
        Self {
            watch_buffer_length: 128,
            buffer_write_timeout: Duration::from_secs(1),
            broadcast_capacity: 1024,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    head: Revision,
    tuples: HashSet<RelationTuple>,
    changelog: Vec<ChangeBatch>,
}

impl State {
    fn changes_after(&self, after: Revision) -> Vec<ChangeBatch> {
        // Revisions are dense and start at 1, so the batch for revision N sits at N - 1.
        let start = usize::try_from(after.value()).unwrap_or(usize::MAX);
        self.changelog.iter().skip(start).cloned().collect()
    }
}

/// In-memory implementation of [`Datastore`].
///
/// # Performance Characteristics
///
/// - **Write**: O(U) for U updates, plus one broadcast
/// - **Watch from revision R**: O(H - R) backlog replay, where H is the head revision
#[derive(Debug)]
pub struct MemoryDataStore {
    state: Arc<RwLock<State>>,
    broadcast: broadcast::Sender<ChangeBatch>,
    config: MemoryDataStoreConfig,
}

impl Default for MemoryDataStore {
    fn default() -> Self {
        Self::with_config(MemoryDataStoreConfig::default())
    }
}

impl MemoryDataStore {
    /// Creates a new in-memory data store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory data store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn with_config(config: MemoryDataStoreConfig) -> Self {
        let (broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
        Self {
            state: Arc::new(RwLock::new(State::default())),
            broadcast,
            config,
        }
    }

    pub fn config(&self) -> &MemoryDataStoreConfig {
        &self.config
    }

    /// Returns true if the tuple is currently stored.
    pub async fn contains(&self, tuple: &RelationTuple) -> bool {
        self.state.read().await.tuples.contains(tuple)
    }
}

fn validate_update(update: &TupleUpdate) -> StorageResult<()> {
    let tuple = &update.tuple;
    let fields = [
        ("resource namespace", &tuple.resource.namespace),
        ("resource object id", &tuple.resource.object_id),
        ("resource relation", &tuple.resource.relation),
        ("subject namespace", &tuple.subject.namespace),
        ("subject object id", &tuple.subject.object_id),
        ("subject relation", &tuple.subject.relation),
    ];
    for (name, value) in fields {
        if value.is_empty() {
            return Err(StorageError::InvalidInput {
                message: format!("{name} cannot be empty"),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl Datastore for MemoryDataStore {
    async fn current_revision(&self) -> StorageResult<Revision> {
        Ok(self.state.read().await.head)
    }

    #[instrument(skip(self, cancel), fields(after = %after))]
    fn watch(&self, after: Revision, cancel: CancellationToken) -> WatchFeed {
        let (changes_tx, changes) = mpsc::channel(self.config.watch_buffer_length.max(1));
        let (errors_tx, errors) = mpsc::channel(1);

        let feed = Feed {
            state: Arc::clone(&self.state),
            broadcast: self.broadcast.clone(),
            changes_tx,
            cancel,
            write_timeout: self.config.buffer_write_timeout,
        };

        tokio::spawn(async move {
            if let Err(err) = feed.run(after).await {
                debug!(error = %err, "change feed terminated");
                let _ = errors_tx.send(err).await;
            }
        });

        WatchFeed { changes, errors }
    }

    #[instrument(skip(self, updates), fields(count = updates.len()))]
    async fn write_tuples(&self, updates: Vec<TupleUpdate>) -> StorageResult<Revision> {
        if updates.is_empty() {
            return Err(StorageError::InvalidInput {
                message: "at least one update is required".to_string(),
            });
        }
        for update in &updates {
            validate_update(update)?;
        }

        let mut state = self.state.write().await;

        // Reject the whole batch before mutating anything.
        let mut created: HashSet<&RelationTuple> = HashSet::new();
        for update in &updates {
            if update.operation == UpdateOperation::Create
                && (state.tuples.contains(&update.tuple) || !created.insert(&update.tuple))
            {
                return Err(StorageError::DuplicateTuple {
                    tuple: update.tuple.to_string(),
                });
            }
        }

        for update in &updates {
            match update.operation {
                UpdateOperation::Touch | UpdateOperation::Create => {
                    state.tuples.insert(update.tuple.clone());
                }
                UpdateOperation::Delete => {
                    state.tuples.remove(&update.tuple);
                }
            }
        }

        let revision = state.head.checked_next().ok_or_else(|| StorageError::Internal {
            message: "revision space exhausted".to_string(),
        })?;
        state.head = revision;
        let batch = ChangeBatch::new(revision, updates);
        state.changelog.push(batch.clone());

        // No receivers just means nobody is watching.
        let _ = self.broadcast.send(batch);

        Ok(revision)
    }
}

/// A single subscriber's change feed task.
struct Feed {
    state: Arc<RwLock<State>>,
    broadcast: broadcast::Sender<ChangeBatch>,
    changes_tx: mpsc::Sender<ChangeBatch>,
    cancel: CancellationToken,
    write_timeout: Duration,
}

impl Feed {
    async fn run(self, after: Revision) -> StorageResult<()> {
        let (backlog, mut live) = {
            let state = self.state.read().await;
            (state.changes_after(after), self.broadcast.subscribe())
        };

        let mut last_sent = after;
        for batch in backlog {
            last_sent = batch.revision;
            if !self.forward(batch).await? {
                return Ok(());
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(StorageError::WatchCanceled),
                _ = self.changes_tx.closed() => return Ok(()),
                received = live.recv() => match received {
                    Ok(batch) => {
                        if batch.revision <= last_sent {
                            continue;
                        }
                        last_sent = batch.revision;
                        if !self.forward(batch).await? {
                            return Ok(());
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "watch subscriber lagged behind broadcast");
                        return Err(StorageError::WatchDisconnected);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StorageError::Internal {
                            message: "change broadcast closed".to_string(),
                        });
                    }
                },
            }
        }
    }

    /// Hands a batch to the subscriber. Returns `Ok(false)` once the subscriber is gone.
    async fn forward(&self, batch: ChangeBatch) -> StorageResult<bool> {
        let revision = batch.revision;
        let send = tokio::time::timeout(self.write_timeout, self.changes_tx.send(batch));
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StorageError::WatchCanceled),
            sent = send => match sent {
                Ok(Ok(())) => Ok(true),
                Ok(Err(_)) => Ok(false),
                Err(_) => {
                    warn!(%revision, "watch subscriber buffer full, disconnecting");
                    Err(StorageError::WatchDisconnected)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(tuple: &str) -> TupleUpdate {
        TupleUpdate::touch(RelationTuple::parse(tuple).unwrap())
    }

    #[tokio::test]
    async fn test_new_store_starts_at_zero() {
        let store = MemoryDataStore::new();
        assert_eq!(store.current_revision().await.unwrap(), Revision::ZERO);
    }

    #[tokio::test]
    async fn test_each_write_advances_revision() {
        let store = MemoryDataStore::new();
        let first = store
            .write_tuples(vec![touch("document:a#viewer@user:alice")])
            .await
            .unwrap();
        let second = store
            .write_tuples(vec![touch("document:b#viewer@user:alice")])
            .await
            .unwrap();

        assert_eq!(first, Revision::new(1));
        assert_eq!(second, Revision::new(2));
        assert_eq!(store.current_revision().await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_touch_then_delete() {
        let store = MemoryDataStore::new();
        let tuple = RelationTuple::parse("document:a#viewer@user:alice").unwrap();

        store
            .write_tuples(vec![TupleUpdate::touch(tuple.clone())])
            .await
            .unwrap();
        assert!(store.contains(&tuple).await);

        store
            .write_tuples(vec![TupleUpdate::delete(tuple.clone())])
            .await
            .unwrap();
        assert!(!store.contains(&tuple).await);
    }

    #[tokio::test]
    async fn test_create_existing_tuple_is_rejected_atomically() {
        let store = MemoryDataStore::new();
        let existing = RelationTuple::parse("document:a#viewer@user:alice").unwrap();
        let fresh = RelationTuple::parse("document:b#viewer@user:alice").unwrap();
        store
            .write_tuples(vec![TupleUpdate::touch(existing.clone())])
            .await
            .unwrap();

        let err = store
            .write_tuples(vec![
                TupleUpdate::create(fresh.clone()),
                TupleUpdate::create(existing),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::DuplicateTuple { .. }));
        assert!(!store.contains(&fresh).await);
        assert_eq!(store.current_revision().await.unwrap(), Revision::new(1));
    }

    #[tokio::test]
    async fn test_empty_write_is_rejected() {
        let store = MemoryDataStore::new();
        let err = store.write_tuples(Vec::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_empty_field_is_rejected() {
        let store = MemoryDataStore::new();
        let mut update = touch("document:a#viewer@user:alice");
        update.tuple.resource.namespace.clear();

        let err = store.write_tuples(vec![update]).await.unwrap_err();
        assert!(err.to_string().contains("resource namespace"));
    }

    #[tokio::test]
    async fn test_write_at_max_revision_fails_without_committing() {
        let store = MemoryDataStore::new();
        store.state.write().await.head = Revision::new(u64::MAX);

        let err = store
            .write_tuples(vec![touch("document:a#viewer@user:alice")])
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Internal { .. }));
        assert_eq!(
            store.current_revision().await.unwrap(),
            Revision::new(u64::MAX)
        );
    }

    #[tokio::test]
    async fn test_small_broadcast_capacity_disconnects_lagging_feed() {
        let store = MemoryDataStore::with_config(MemoryDataStoreConfig {
            watch_buffer_length: 1,
            buffer_write_timeout: Duration::from_secs(5),
            broadcast_capacity: 2,
        });
        let mut feed = store.watch(Revision::ZERO, CancellationToken::new());

        // Once the first batch arrives the feed is reading the live broadcast.
        store
            .write_tuples(vec![touch("document:first#viewer@user:alice")])
            .await
            .unwrap();
        let first = tokio::time::timeout(Duration::from_secs(2), feed.changes.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.revision, Revision::new(1));

        for id in 0..8 {
            store
                .write_tuples(vec![touch(&format!("document:{id}#viewer@user:alice"))])
                .await
                .unwrap();
        }

        // Drain until the feed reports why it stopped.
        let err = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                tokio::select! {
                    err = feed.errors.recv() => break err,
                    _ = feed.changes.recv() => {}
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(err, Some(StorageError::WatchDisconnected));
    }
}
