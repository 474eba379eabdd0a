//! Tests for the watch handler.

use super::*;
use async_trait::async_trait;
use rszed_domain::model::{ChangeBatch, RelationTuple, TupleUpdate};
use rszed_domain::{Revision, RevisionCodec, ZookieCodec};
use rszed_storage::{Datastore, MemoryDataStore, StorageError, StorageResult, WatchFeed};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(2);

// ============================================================
// Test Mocks
// ============================================================

/// Datastore whose feed replays a fixed script and then closes.
struct ScriptedDatastore {
    head: StorageResult<Revision>,
    batches: Vec<ChangeBatch>,
    error: Option<StorageError>,
    watch_calls: AtomicUsize,
    watched_after: Mutex<Option<Revision>>,
}

impl ScriptedDatastore {
    fn new() -> Self {
        Self {
            head: Ok(Revision::new(42)),
            batches: vec![],
            error: None,
            watch_calls: AtomicUsize::new(0),
            watched_after: Mutex::new(None),
        }
    }

    fn with_head(mut self, head: StorageResult<Revision>) -> Self {
        self.head = head;
        self
    }

    fn with_batches(mut self, batches: Vec<ChangeBatch>) -> Self {
        self.batches = batches;
        self
    }

    fn with_error(mut self, error: StorageError) -> Self {
        self.error = Some(error);
        self
    }

    fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    fn watched_after(&self) -> Option<Revision> {
        *self.watched_after.lock().unwrap()
    }
}

#[async_trait]
impl Datastore for ScriptedDatastore {
    async fn current_revision(&self) -> StorageResult<Revision> {
        self.head.clone()
    }

    fn watch(&self, after: Revision, _cancel: CancellationToken) -> WatchFeed {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        *self.watched_after.lock().unwrap() = Some(after);

        let (changes_tx, changes) = mpsc::channel(self.batches.len().max(1));
        let (errors_tx, errors) = mpsc::channel(1);
        for batch in &self.batches {
            changes_tx.try_send(batch.clone()).unwrap();
        }
        if let Some(err) = &self.error {
            errors_tx.try_send(err.clone()).unwrap();
        }
        // Senders drop here, so the feed closes once drained.
        WatchFeed { changes, errors }
    }

    async fn write_tuples(&self, _updates: Vec<TupleUpdate>) -> StorageResult<Revision> {
        Err(StorageError::Internal {
            message: "read-only".to_string(),
        })
    }
}

fn touch(tuple: &str) -> TupleUpdate {
    TupleUpdate::touch(RelationTuple::parse(tuple).unwrap())
}

fn batch(revision: u64, tuples: &[&str]) -> ChangeBatch {
    ChangeBatch::new(
        Revision::new(revision),
        tuples.iter().map(|t| touch(t)).collect(),
    )
}

fn request(namespaces: &[&str], start_token: Option<String>) -> WatchRequest {
    WatchRequest {
        namespaces: namespaces.iter().map(|n| n.to_string()).collect(),
        start_token,
    }
}

fn handler<S: Datastore>(datastore: Arc<S>) -> WatchHandler<S, ZookieCodec> {
    WatchHandler::new(datastore, Arc::new(ZookieCodec))
}

/// Runs a watch to completion and collects everything it forwarded.
async fn run_to_end<S: Datastore>(
    datastore: Arc<S>,
    req: WatchRequest,
) -> (WatchResult<()>, Vec<WatchResponse>) {
    let (sink, mut responses) = mpsc::channel(16);
    let outcome = timeout(
        WAIT,
        handler(datastore).watch(req, sink, CancellationToken::new()),
    )
    .await
    .unwrap();

    let mut received = Vec::new();
    while let Ok(response) = responses.try_recv() {
        received.push(response);
    }
    (outcome, received)
}

// ============================================================
// Start validation
// ============================================================

#[tokio::test]
async fn test_empty_namespaces_rejected_before_feed_opens() {
    let datastore = Arc::new(ScriptedDatastore::new());

    let (outcome, received) = run_to_end(datastore.clone(), request(&[], None)).await;

    let err = outcome.unwrap_err();
    assert_eq!(err.code(), WatchErrorCode::InvalidArgument);
    assert_eq!(
        err.message(),
        "watch request must contain one or more namespaces"
    );
    assert!(received.is_empty());
    assert_eq!(datastore.watch_calls(), 0);
}

#[tokio::test]
async fn test_undecodable_start_token_rejected() {
    let datastore = Arc::new(ScriptedDatastore::new());

    let (outcome, _) = run_to_end(
        datastore.clone(),
        request(&["document"], Some("not a token!".to_string())),
    )
    .await;

    let err = outcome.unwrap_err();
    assert_eq!(err.code(), WatchErrorCode::InvalidArgument);
    assert!(err.message().starts_with("failed to decode start revision: "));
    assert_eq!(datastore.watch_calls(), 0);
}

#[tokio::test]
async fn test_head_lookup_failure_is_unavailable() {
    let datastore = Arc::new(ScriptedDatastore::new().with_head(Err(StorageError::Unavailable {
        message: "backend down".to_string(),
    })));

    let (outcome, _) = run_to_end(datastore.clone(), request(&["document"], None)).await;

    let err = outcome.unwrap_err();
    assert_eq!(err.code(), WatchErrorCode::Unavailable);
    assert!(err.message().starts_with("failed to start watch: "));
    assert!(err.message().contains("backend down"));
    assert_eq!(datastore.watch_calls(), 0);
}

#[tokio::test]
async fn test_start_token_sets_feed_start_revision() {
    let datastore = Arc::new(ScriptedDatastore::new());
    let token = ZookieCodec.encode(Revision::new(7));

    let subscription = handler(datastore.clone())
        .start(request(&["document"], Some(token)), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(subscription.start_revision(), Revision::new(7));
    assert_eq!(datastore.watched_after(), Some(Revision::new(7)));
    assert_eq!(datastore.watch_calls(), 1);
}

#[tokio::test]
async fn test_missing_or_empty_token_starts_at_head() {
    for token in [None, Some(String::new())] {
        let datastore = Arc::new(ScriptedDatastore::new());

        let subscription = handler(datastore.clone())
            .start(request(&["document"], token), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(subscription.start_revision(), Revision::new(42));
        assert_eq!(datastore.watched_after(), Some(Revision::new(42)));
    }
}

// ============================================================
// Forwarding
// ============================================================

#[tokio::test]
async fn test_forwards_only_requested_namespaces_and_skips_empty_batches() {
    let datastore = Arc::new(
        ScriptedDatastore::new()
            .with_batches(vec![
                batch(
                    43,
                    &[
                        "document:a#viewer@user:alice",
                        "folder:f#viewer@user:alice",
                        "document:c#viewer@user:bob",
                    ],
                ),
                batch(44, &["folder:g#viewer@user:alice"]),
                batch(45, &["document:d#owner@user:carol"]),
            ])
            .with_error(StorageError::WatchDisconnected),
    );

    let (outcome, received) = run_to_end(datastore, request(&["document"], None)).await;

    // Buffered batches arrive before the feed error is reported.
    assert_eq!(received.len(), 2);

    let ids: Vec<&str> = received[0]
        .updates
        .iter()
        .map(|u| u.tuple.resource.object_id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert_eq!(
        ZookieCodec.decode(&received[0].end_token).unwrap(),
        Revision::new(43)
    );

    assert_eq!(received[1].updates.len(), 1);
    assert_eq!(
        ZookieCodec.decode(&received[1].end_token).unwrap(),
        Revision::new(45)
    );

    assert_eq!(outcome.unwrap_err().code(), WatchErrorCode::ResourceExhausted);
}

#[tokio::test]
async fn test_responses_never_carry_empty_updates() {
    let datastore = Arc::new(ScriptedDatastore::new().with_batches(vec![
        batch(1, &["folder:f#viewer@user:alice"]),
        batch(2, &["group:g#member@user:alice"]),
    ]));

    let (_, received) = run_to_end(datastore, request(&["document"], None)).await;

    assert!(received.is_empty());
}

// ============================================================
// Termination
// ============================================================

#[tokio::test]
async fn test_feed_cancel_is_classified_as_canceled() {
    let datastore = Arc::new(ScriptedDatastore::new().with_error(StorageError::WatchCanceled));

    let (outcome, _) = run_to_end(datastore, request(&["document"], None)).await;

    let err = outcome.unwrap_err();
    assert_eq!(err.code(), WatchErrorCode::Canceled);
    assert!(err.message().starts_with("watch canceled by user: "));
}

#[tokio::test]
async fn test_feed_disconnect_is_classified_as_resource_exhausted() {
    let datastore =
        Arc::new(ScriptedDatastore::new().with_error(StorageError::WatchDisconnected));

    let (outcome, _) = run_to_end(datastore, request(&["document"], None)).await;

    let err = outcome.unwrap_err();
    assert_eq!(err.code(), WatchErrorCode::ResourceExhausted);
    assert!(err.message().starts_with("watch disconnected: "));
}

#[tokio::test]
async fn test_other_feed_errors_are_internal() {
    let datastore = Arc::new(ScriptedDatastore::new().with_error(StorageError::Internal {
        message: "disk on fire".to_string(),
    }));

    let (outcome, _) = run_to_end(datastore, request(&["document"], None)).await;

    let err = outcome.unwrap_err();
    assert_eq!(err.code(), WatchErrorCode::Internal);
    assert!(err.message().starts_with("watch error: "));
    assert!(err.message().contains("disk on fire"));
}

#[tokio::test]
async fn test_feed_closing_without_error_is_internal() {
    let datastore = Arc::new(ScriptedDatastore::new());

    let (outcome, _) = run_to_end(datastore, request(&["document"], None)).await;

    assert_eq!(outcome.unwrap_err().code(), WatchErrorCode::Internal);
}

#[tokio::test]
async fn test_caller_cancel_ends_watch_as_canceled() {
    let datastore = Arc::new(MemoryDataStore::new());
    let (sink, _responses) = mpsc::channel(4);
    let cancel = CancellationToken::new();

    let watch = {
        let handler = handler(datastore);
        let cancel = cancel.clone();
        tokio::spawn(async move { handler.watch(request(&["document"], None), sink, cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let err = timeout(WAIT, watch).await.unwrap().unwrap().unwrap_err();
    assert_eq!(err.code(), WatchErrorCode::Canceled);
}

#[tokio::test]
async fn test_client_going_away_ends_watch_cleanly() {
    let datastore = Arc::new(MemoryDataStore::new());
    let (sink, responses) = mpsc::channel(4);
    let cancel = CancellationToken::new();

    let watch = {
        let handler = handler(datastore);
        let cancel = cancel.clone();
        tokio::spawn(async move { handler.watch(request(&["document"], None), sink, cancel).await })
    };

    drop(responses);

    let outcome = timeout(WAIT, watch).await.unwrap().unwrap();
    assert!(outcome.is_ok());
    // Stopping the feed does not cancel the caller's token.
    assert!(!cancel.is_cancelled());
}

// ============================================================
// End to end against the in-memory datastore
// ============================================================

#[tokio::test]
async fn test_resume_from_end_token_replays_later_changes_only() {
    let datastore = Arc::new(MemoryDataStore::new());
    let first = datastore
        .write_tuples(vec![touch("document:a#viewer@user:alice")])
        .await
        .unwrap();
    datastore
        .write_tuples(vec![touch("folder:f#viewer@user:alice")])
        .await
        .unwrap();
    let third = datastore
        .write_tuples(vec![touch("document:b#viewer@user:alice")])
        .await
        .unwrap();

    let (sink, mut responses) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    let start_token = Some(ZookieCodec.encode(first));

    let watch = {
        let handler = handler(datastore.clone());
        let cancel = cancel.clone();
        tokio::spawn(async move {
            handler
                .watch(request(&["document"], start_token), sink, cancel)
                .await
        })
    };

    let response = timeout(WAIT, responses.recv()).await.unwrap().unwrap();
    assert_eq!(response.updates.len(), 1);
    assert_eq!(response.updates[0].tuple.resource.object_id, "b");
    assert_eq!(ZookieCodec.decode(&response.end_token).unwrap(), third);

    // Live writes follow the replayed backlog.
    let fourth = datastore
        .write_tuples(vec![touch("document:c#viewer@user:bob")])
        .await
        .unwrap();
    let response = timeout(WAIT, responses.recv()).await.unwrap().unwrap();
    assert_eq!(response.updates[0].tuple.resource.object_id, "c");
    assert_eq!(ZookieCodec.decode(&response.end_token).unwrap(), fourth);

    cancel.cancel();
    let err = timeout(WAIT, watch).await.unwrap().unwrap().unwrap_err();
    assert_eq!(err.code(), WatchErrorCode::Canceled);
}

#[tokio::test]
async fn test_concurrent_watches_are_independent() {
    let datastore = Arc::new(MemoryDataStore::new());
    let handler = handler(datastore.clone());

    let docs = handler
        .start(request(&["document"], None), CancellationToken::new())
        .await
        .unwrap();
    let folders = handler
        .start(request(&["folder"], None), CancellationToken::new())
        .await
        .unwrap();

    let (docs_sink, mut docs_rx) = mpsc::channel(4);
    let (folders_sink, mut folders_rx) = mpsc::channel(4);
    tokio::spawn(docs.run(docs_sink));
    tokio::spawn(folders.run(folders_sink));

    datastore
        .write_tuples(vec![
            touch("document:a#viewer@user:alice"),
            touch("folder:f#viewer@user:alice"),
        ])
        .await
        .unwrap();

    let doc = timeout(WAIT, docs_rx.recv()).await.unwrap().unwrap();
    let folder = timeout(WAIT, folders_rx.recv()).await.unwrap().unwrap();
    assert_eq!(doc.updates[0].tuple.namespace(), "document");
    assert_eq!(folder.updates[0].tuple.namespace(), "folder");
    assert_eq!(doc.end_token, folder.end_token);
}
