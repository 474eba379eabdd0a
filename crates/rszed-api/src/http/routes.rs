//! HTTP route definitions and handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::error;

use rszed_domain::dispatch::DispatchCheckRequest;
use rszed_domain::model::{RelationTuple, TupleUpdate, UpdateOperation};
use rszed_domain::{CacheKeyed, RevisionCodec};
use rszed_server::handlers::watch::{WatchError, WatchRequest};
use rszed_storage::{Datastore, StorageError};

use super::state::AppState;
use crate::errors::{storage_error_to_http, watch_error_to_http};
use crate::streaming::spawn_watch;

/// Content type of watch streams.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Default request body size limit (1MB).
/// This prevents memory exhaustion from oversized payloads.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// JSON extractor that returns 400 Bad Request instead of 422 Unprocessable Entity
/// for deserialization errors.
///
/// Preserves 413 Payload Too Large for body limit errors.
pub struct JsonBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBadRequest(value)),
            Err(rejection) => {
                let message = rejection.body_text();
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    Err(ApiError::new(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "payload_too_large",
                        message,
                    ))
                } else {
                    Err(ApiError::validation_error(message))
                }
            }
        }
    }
}

fn api_routes<S: Datastore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/v1/watch", post(watch::<S>))
        .route("/v1/tuples", post(write_tuples::<S>))
        .route("/v1/revision", get(current_revision::<S>))
        .route("/v1/dispatch/check-key", post(check_key::<S>))
}

/// Creates the HTTP router.
///
/// Applies the default body size limit (1MB) to protect against oversized payloads.
pub fn create_router<S: Datastore>(state: AppState<S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
pub fn create_router_with_body_limit<S: Datastore>(
    state: AppState<S>,
    body_limit: usize,
) -> Router {
    api_routes::<S>()
        .route("/health", get(health_check))
        .with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
}

// ============================================================
// Error Handling
// ============================================================

/// JSON error body: `{"error":{"code":"...","message":"..."}}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a ApiError,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error (400).
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    /// Creates an error from a watch outcome, keeping its code.
    pub fn from_watch_error(err: &WatchError) -> Self {
        Self::new(watch_error_to_http(err), err.code().as_str(), err.message())
    }

    /// Creates an error from a storage failure.
    pub fn from_storage_error(err: &StorageError) -> Self {
        let status = storage_error_to_http(err);
        let code = match status {
            StatusCode::BAD_REQUEST => "invalid_argument",
            StatusCode::CONFLICT => "already_exists",
            StatusCode::SERVICE_UNAVAILABLE => "unavailable",
            _ => "internal",
        };
        Self::new(status, code, err.to_string())
    }

    /// Renders the error as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": { "code": self.code, "message": self.message } })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorEnvelope { error: &self })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================
// Handlers
// ============================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Streams watch responses as newline-delimited JSON.
///
/// Start failures are returned as an ordinary JSON error with the mapped
/// status. Once the stream has begun the status is 200, so a later failure
/// is reported as a final error line.
async fn watch<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(request): JsonBadRequest<WatchRequest>,
) -> ApiResult<Response> {
    let subscription = state
        .watch_handler
        .start(request, state.shutdown.child_token())
        .await
        .map_err(|e| ApiError::from_watch_error(&e))?;

    let lines = spawn_watch(
        subscription,
        state.response_buffer,
        |response| Ok::<_, Infallible>(ndjson_line(&response)),
        |err| Ok(ndjson_line(&ApiError::from_watch_error(&err).to_json())),
    );

    Ok((
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(ReceiverStream::new(lines)),
    )
        .into_response())
}

fn ndjson_line<T: Serialize>(value: &T) -> Bytes {
    let mut line = match serde_json::to_vec(value) {
        Ok(line) => line,
        Err(e) => {
            error!(error = %e, "failed to serialize watch line");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
                .to_json()
                .to_string()
                .into_bytes()
        }
    };
    line.push(b'\n');
    Bytes::from(line)
}

/// Request body for writing tuples.
#[derive(Debug, Deserialize)]
pub struct WriteTuplesBody {
    pub updates: Vec<WriteTupleUpdate>,
}

/// One update in a write request; `tuple` is in `ns:id#rel@ns:id[#rel]` form.
#[derive(Debug, Deserialize)]
pub struct WriteTupleUpdate {
    pub operation: UpdateOperation,
    pub tuple: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevisionTokenBody {
    pub revision_token: String,
}

async fn write_tuples<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<WriteTuplesBody>,
) -> ApiResult<Json<RevisionTokenBody>> {
    let mut updates = Vec::with_capacity(body.updates.len());
    for (i, update) in body.updates.into_iter().enumerate() {
        let tuple = RelationTuple::parse(&update.tuple)
            .map_err(|e| ApiError::validation_error(format!("update at index {i}: {e}")))?;
        updates.push(TupleUpdate {
            operation: update.operation,
            tuple,
        });
    }

    let revision = state
        .storage
        .write_tuples(updates)
        .await
        .map_err(|e| ApiError::from_storage_error(&e))?;

    Ok(Json(RevisionTokenBody {
        revision_token: state.codec.encode(revision),
    }))
}

async fn current_revision<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<Json<RevisionTokenBody>> {
    let revision = state.storage.current_revision().await.map_err(|e| {
        error!(error = %e, "failed to read current revision");
        ApiError::from_storage_error(&e)
    })?;

    Ok(Json(RevisionTokenBody {
        revision_token: state.codec.encode(revision),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckKeyBody {
    pub cache_key: String,
    pub canonical_key: String,
    pub cached: Option<bool>,
}

/// Reports the cache identity of a dispatch check request.
async fn check_key<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(request): JsonBadRequest<DispatchCheckRequest>,
) -> Json<CheckKeyBody> {
    let key = request.cache_key();
    Json(CheckKeyBody {
        cache_key: key.to_string(),
        canonical_key: request.canonical_key(),
        cached: state.dispatch_cache.get(&key).await,
    })
}
