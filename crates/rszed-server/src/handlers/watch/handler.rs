//! Watch subscription controller.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rszed_domain::{NamespaceFilter, Revision, RevisionCodec};
use rszed_storage::{Datastore, WatchFeed};

use super::types::{classify_feed_error, WatchError, WatchRequest, WatchResponse, WatchResult};

/// Opens watch subscriptions against a datastore.
///
/// Each call is independent: the handler holds no per-stream state, so one
/// handler can serve any number of concurrent watches.
pub struct WatchHandler<S, C>
where
    S: Datastore,
    C: RevisionCodec,
{
    datastore: Arc<S>,
    codec: Arc<C>,
}

impl<S, C> Clone for WatchHandler<S, C>
where
    S: Datastore,
    C: RevisionCodec,
{
    fn clone(&self) -> Self {
        Self {
            datastore: Arc::clone(&self.datastore),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<S, C> WatchHandler<S, C>
where
    S: Datastore,
    C: RevisionCodec,
{
    pub fn new(datastore: Arc<S>, codec: Arc<C>) -> Self {
        Self { datastore, codec }
    }

    /// Validates the request, resolves the start revision and opens the feed.
    ///
    /// Any error is returned before the feed is opened, so a failed start
    /// never leaves a subscription running.
    pub async fn start(
        &self,
        request: WatchRequest,
        cancel: CancellationToken,
    ) -> WatchResult<WatchSubscription<C>> {
        if request.namespaces.is_empty() {
            return Err(WatchError::InvalidArgument(
                "watch request must contain one or more namespaces".to_string(),
            ));
        }
        let filter = NamespaceFilter::new(request.namespaces);

        let start_revision = match request.start_token.as_deref() {
            Some(token) if !token.is_empty() => self.codec.decode(token).map_err(|e| {
                WatchError::InvalidArgument(format!("failed to decode start revision: {e}"))
            })?,
            _ => self
                .datastore
                .current_revision()
                .await
                .map_err(|e| WatchError::Unavailable(format!("failed to start watch: {e}")))?,
        };

        let feed_cancel = cancel.child_token();
        let feed = self.datastore.watch(start_revision, feed_cancel.clone());
        metrics::counter!("rszed_watch_streams_started_total").increment(1);
        debug!(
            namespaces = filter.len(),
            start_revision = %start_revision,
            "watch subscription opened"
        );

        Ok(WatchSubscription {
            filter,
            start_revision,
            feed,
            feed_cancel,
            cancel,
            codec: Arc::clone(&self.codec),
        })
    }

    /// Runs a complete watch call: start, then stream into `sink` until terminated.
    pub async fn watch(
        &self,
        request: WatchRequest,
        sink: mpsc::Sender<WatchResponse>,
        cancel: CancellationToken,
    ) -> WatchResult<()> {
        self.start(request, cancel).await?.run(sink).await
    }
}

/// An open watch, owned by exactly one worker.
pub struct WatchSubscription<C: RevisionCodec> {
    filter: NamespaceFilter,
    start_revision: Revision,
    feed: WatchFeed,
    feed_cancel: CancellationToken,
    cancel: CancellationToken,
    codec: Arc<C>,
}

enum Delivery {
    Sent,
    ClientGone,
    Canceled,
}

impl<C: RevisionCodec> WatchSubscription<C> {
    /// The revision the feed resumes strictly after.
    pub fn start_revision(&self) -> Revision {
        self.start_revision
    }

    /// The caller's cancellation token this watch observes.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Streams filtered batches into `sink` until the watch terminates.
    ///
    /// Returns `Ok(())` when the receiving side of `sink` goes away. Every
    /// other exit is an error: caller cancellation, or a classified feed
    /// failure. Batches already buffered by the feed are forwarded before a
    /// feed error is reported.
    pub async fn run(mut self, sink: mpsc::Sender<WatchResponse>) -> WatchResult<()> {
        let outcome = self.stream(&sink).await;

        // Stop the feed whatever ended the stream.
        self.feed_cancel.cancel();

        let outcome_label = match &outcome {
            Ok(()) => {
                info!(start_revision = %self.start_revision, "watch client disconnected");
                "ok"
            }
            Err(err) => {
                match err {
                    WatchError::Canceled(_) => info!(error = %err, "watch canceled"),
                    _ => warn!(error = %err, code = err.code().as_str(), "watch terminated"),
                }
                err.code().as_str()
            }
        };
        metrics::counter!("rszed_watch_streams_terminated_total", "outcome" => outcome_label)
            .increment(1);

        outcome
    }

    async fn stream(&mut self, sink: &mpsc::Sender<WatchResponse>) -> WatchResult<()> {
        let mut changes_open = true;
        let mut errors_open = true;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(WatchError::Canceled("watch canceled by caller".to_string()));
                }
                _ = sink.closed() => return Ok(()),
                batch = self.feed.changes.recv(), if changes_open => match batch {
                    Some(batch) => {
                        let revision = batch.revision;
                        let updates = self.filter.filter_updates(batch.changes);
                        if updates.is_empty() {
                            continue;
                        }
                        let response = WatchResponse {
                            updates,
                            end_token: self.codec.encode(revision),
                        };
                        match self.deliver(sink, response).await {
                            Delivery::Sent => {}
                            Delivery::ClientGone => return Ok(()),
                            Delivery::Canceled => {
                                return Err(WatchError::Canceled(
                                    "watch canceled by caller".to_string(),
                                ));
                            }
                        }
                    }
                    None => changes_open = false,
                },
                err = self.feed.errors.recv(), if errors_open => match err {
                    Some(err) => return Err(classify_feed_error(err)),
                    None => errors_open = false,
                },
            }

            if !changes_open && !errors_open {
                return Err(WatchError::Internal(
                    "watch error: change feed closed unexpectedly".to_string(),
                ));
            }
        }
    }

    async fn deliver(
        &self,
        sink: &mpsc::Sender<WatchResponse>,
        response: WatchResponse,
    ) -> Delivery {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Delivery::Canceled,
            sent = sink.send(response) => match sent {
                Ok(()) => Delivery::Sent,
                Err(_) => Delivery::ClientGone,
            },
        }
    }
}
