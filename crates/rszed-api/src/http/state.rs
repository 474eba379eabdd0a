//! Application state for HTTP handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use rszed_domain::{DispatchCache, DispatchCacheConfig, ZookieCodec};
use rszed_server::handlers::watch::WatchHandler;
use rszed_storage::Datastore;

use crate::grpc::DEFAULT_RESPONSE_BUFFER;

/// Application state shared across all HTTP handlers.
///
/// # Type Parameters
///
/// * `S` - The storage backend implementing `Datastore`
pub struct AppState<S: Datastore> {
    /// The storage backend.
    pub storage: Arc<S>,
    /// Revision token codec shared with the watch handler.
    pub codec: Arc<ZookieCodec>,
    /// The watch handler.
    pub watch_handler: WatchHandler<S, ZookieCodec>,
    /// Cached dispatch results, keyed by canonical dispatch cache key.
    pub dispatch_cache: Arc<DispatchCache<bool>>,
    /// Capacity of each watch stream's outbound channel.
    pub response_buffer: usize,
    /// Cancelled on server shutdown to end open watch streams.
    pub shutdown: CancellationToken,
}

impl<S: Datastore> AppState<S> {
    /// Creates a new application state with default cache configuration.
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_cache_config(storage, DispatchCacheConfig::default())
    }

    /// Creates a new application state with custom cache configuration.
    pub fn with_cache_config(storage: Arc<S>, cache_config: DispatchCacheConfig) -> Self {
        let codec = Arc::new(ZookieCodec);
        let watch_handler = WatchHandler::new(Arc::clone(&storage), Arc::clone(&codec));

        Self {
            storage,
            codec,
            watch_handler,
            dispatch_cache: Arc::new(DispatchCache::new(cache_config)),
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
}
