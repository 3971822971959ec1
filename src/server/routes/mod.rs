//! Route table.

mod admin;
mod auth;
mod events;
mod queue;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};

use crate::filestore::FileStore;
use crate::store::Store;
use crate::system::StatusReport;

use super::AppState;

pub(super) fn router<S: Store, F: FileStore>() -> Router<Arc<AppState<S, F>>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status::<S, F>))
        .route("/api/auth/register", post(auth::register::<S, F>))
        .route("/api/auth/login", post(auth::login::<S, F>))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        .route("/api/queue", get(queue::list::<S, F>))
        .route("/api/images", post(queue::upload::<S, F>))
        .route("/api/images/{id}", axum::routing::delete(queue::delete::<S, F>))
        .route("/api/images/{id}/claim", post(queue::claim::<S, F>))
        .route("/api/images/{id}/unclaim", post(queue::unclaim::<S, F>))
        .route("/api/images/{id}/complete", post(queue::complete::<S, F>))
        .route("/api/image", get(queue::proxy::<S, F>))
        .route("/api/events", get(events::stream::<S, F>))
        .route("/api/admin/stats", get(admin::stats::<S, F>))
        .route(
            "/api/admin/settings",
            get(admin::settings::<S, F>).put(admin::update_settings::<S, F>),
        )
        .route("/api/admin/users", get(admin::users::<S, F>))
        .route("/api/admin/users/{username}/role", put(admin::set_role::<S, F>))
}

/// Liveness.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Public status: maintenance flag, threshold and countdown.
async fn status<S: Store, F: FileStore>(
    axum::extract::State(state): axum::extract::State<Arc<AppState<S, F>>>,
) -> Json<StatusReport> {
    Json(state.context.status(Utc::now()))
}
