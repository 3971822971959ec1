//! Registration, login and logout.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::auth::Session;
use crate::filestore::FileStore;
use crate::model::user::Identity;
use crate::server::{ApiError, AppState, CurrentUser};
use crate::store::Store;
use crate::system::SignedIn;

#[derive(Debug, Deserialize)]
pub(super) struct Credentials {
    username: String,
    password: String,
}

fn signed_in(status: StatusCode, signed: SignedIn) -> impl IntoResponse {
    (
        status,
        [(SET_COOKIE, signed.session.set_cookie())],
        Json(signed.identity),
    )
}

pub(super) async fn register<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    Json(body): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let signed = state.system.register(&body.username, &body.password).await?;
    Ok(signed_in(StatusCode::CREATED, signed))
}

pub(super) async fn login<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    Json(body): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let signed = state.system.login(&body.username, &body.password).await?;
    tracing::debug!(username = %signed.identity.username, "login");
    Ok(signed_in(StatusCode::OK, signed))
}

pub(super) async fn logout() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, [(SET_COOKIE, Session::clear_cookie())])
}

pub(super) async fn me(CurrentUser(identity): CurrentUser) -> Json<Identity> {
    Json(identity)
}
