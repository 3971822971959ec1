//! Request extractors for the signed-in user.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;

use crate::auth::Session;
use crate::error::Error;
use crate::filestore::FileStore;
use crate::model::user::Identity;
use crate::store::Store;

use super::AppState;
use super::error::ApiError;

/// Identity verified from the session cookie on this request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl<S: Store, F: FileStore> FromRequestParts<Arc<AppState<S, F>>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S, F>>,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(Session::from_cookie_header)
            .ok_or_else(|| Error::Unauthenticated("no session".to_string()))??;

        let identity = state.system.verify(&session).await?;
        Ok(CurrentUser(identity))
    }
}

/// A signed-in administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

impl<S: Store, F: FileStore> FromRequestParts<Arc<AppState<S, F>>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S, F>>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        identity.require_admin()?;
        Ok(AdminUser(identity))
    }
}
