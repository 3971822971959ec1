//! Queue routes, upload and the image proxy.
//!
//! Every route here passes admission first: maintenance mode and
//! self-destruct turn requests away before the queue is touched.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{
    CACHE_CONTROL, CONTENT_SECURITY_POLICY, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS,
};
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::error::Error;
use crate::fanout::QueueUpdate;
use crate::filestore::{self, FileStore};
use crate::model::item::{Item, ItemId, NewItem};
use crate::model::user::Identity;
use crate::server::{ApiError, AppState, CurrentUser};
use crate::store::Store;

fn admit<S: Store, F: FileStore>(
    state: &AppState<S, F>,
    identity: &Identity,
) -> Result<(), ApiError> {
    state.context.admit(identity, Utc::now())?;
    Ok(())
}

pub(super) async fn list<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<QueueUpdate>, ApiError> {
    admit(&state, &actor)?;
    Ok(Json(state.queue.snapshot().await?))
}

#[derive(Debug, Deserialize)]
pub(super) struct UploadQuery {
    name: String,
}

/// Store the request body on the file service, then queue it.
pub(super) async fn upload<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    admit(&state, &actor)?;
    let name = query.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("name must not be empty".to_string()).into());
    }
    if body.is_empty() {
        return Err(Error::Validation("upload body is empty".to_string()).into());
    }

    let path = filestore::upload_path(name);
    state.files.put(&path, body.to_vec()).await?;
    let item = state.queue.create(&actor, NewItem::new(name, path)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub(super) async fn claim<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    admit(&state, &actor)?;
    let id: ItemId = id.parse()?;
    Ok(Json(state.queue.claim(&actor, id).await?))
}

pub(super) async fn unclaim<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    admit(&state, &actor)?;
    let id: ItemId = id.parse()?;
    Ok(Json(state.queue.unclaim(&actor, id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CompleteBody {
    #[serde(default)]
    notes: String,
}

pub(super) async fn complete<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<CompleteBody>,
) -> Result<Json<Item>, ApiError> {
    admit(&state, &actor)?;
    let id: ItemId = id.parse()?;
    Ok(Json(state.queue.complete(&actor, id, body.notes.trim()).await?))
}

pub(super) async fn delete<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    admit(&state, &actor)?;
    let id: ItemId = id.parse()?;
    let deleted = state.queue.delete(&actor, id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

#[derive(Debug, Deserialize)]
pub(super) struct ProxyQuery {
    path: String,
}

/// Stream a stored image back with a content type from its extension.
///
/// Uploaded bytes are untrusted: the response may never be sniffed into
/// markup, and any active content runs sandboxed.
pub(super) async fn proxy<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<ProxyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    admit(&state, &actor)?;
    filestore::validate_path(&query.path)?;
    let bytes = state.files.get(&query.path).await?;
    Ok((
        [
            (CONTENT_TYPE, filestore::content_type_for(&query.path)),
            (CACHE_CONTROL, "private, max-age=3600"),
            (X_CONTENT_TYPE_OPTIONS, "nosniff"),
            (CONTENT_SECURITY_POLICY, "default-src 'none'; sandbox"),
        ],
        bytes,
    ))
}
