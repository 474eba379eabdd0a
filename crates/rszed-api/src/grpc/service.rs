//! gRPC watch service implementation.

use std::sync::Arc;

use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::instrument;

use rszed_domain::ZookieCodec;
use rszed_server::handlers::watch::{WatchHandler, WatchRequest, WatchResponse};
use rszed_storage::Datastore;

use crate::errors::watch_error_to_status;
use crate::streaming::spawn_watch;

/// Server stream returned by [`WatchGrpcService::watch`].
pub type WatchResponseStream = ReceiverStream<Result<WatchResponse, Status>>;

/// Default capacity of the per-stream response channel.
pub const DEFAULT_RESPONSE_BUFFER: usize = 64;

/// gRPC watch service.
///
/// Every stream runs under a child of the service's shutdown token, so
/// cancelling that token ends all open watches with `CANCELLED`.
pub struct WatchGrpcService<S: Datastore> {
    handler: WatchHandler<S, ZookieCodec>,
    response_buffer: usize,
    shutdown: CancellationToken,
}

impl<S: Datastore> Clone for WatchGrpcService<S> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            response_buffer: self.response_buffer,
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<S: Datastore> WatchGrpcService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            handler: WatchHandler::new(storage, Arc::new(ZookieCodec)),
            response_buffer: DEFAULT_RESPONSE_BUFFER,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_response_buffer(mut self, response_buffer: usize) -> Self {
        self.response_buffer = response_buffer.max(1);
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Opens a watch stream.
    ///
    /// Validation and start-point failures are returned as the call's
    /// status; no stream is created for them.
    #[instrument(skip_all, fields(namespaces = request.get_ref().namespaces.len()))]
    pub async fn watch(
        &self,
        request: Request<WatchRequest>,
    ) -> Result<Response<WatchResponseStream>, Status> {
        let subscription = self
            .handler
            .start(request.into_inner(), self.shutdown.child_token())
            .await
            .map_err(watch_error_to_status)?;

        let responses = spawn_watch(subscription, self.response_buffer, Ok, |err| {
            Err(watch_error_to_status(err))
        });

        Ok(Response::new(ReceiverStream::new(responses)))
    }
}
