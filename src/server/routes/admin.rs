//! Admin panel: statistics, settings and user roles.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::filestore::FileStore;
use crate::model::settings::{Settings, SettingsUpdate};
use crate::model::user::{Role, UserSummary};
use crate::server::{AdminUser, ApiError, AppState};
use crate::store::Store;
use crate::system::StatusReport;
use crate::view::{LeaderboardRow, Stats};

#[derive(Serialize)]
pub(super) struct StatsResponse {
    stats: Stats,
    leaderboard: Vec<LeaderboardRow>,
    status: StatusReport,
}

pub(super) async fn stats<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let registered = state.system.registered_usernames().await?;
    let stats = state.queue.stats(&registered).await?;
    Ok(Json(StatsResponse {
        leaderboard: stats.leaderboard(),
        stats,
        status: state.context.status(Utc::now()),
    }))
}

pub(super) async fn settings<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.system.settings().await?))
}

pub(super) async fn update_settings<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    AdminUser(admin): AdminUser,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Settings>, ApiError> {
    let settings = state.system.update_settings(&admin, update).await?;
    state.context.apply_settings(settings);
    Ok(Json(settings))
}

pub(super) async fn users<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    Ok(Json(state.system.users(&admin).await?))
}

#[derive(Debug, Deserialize)]
pub(super) struct RoleBody {
    role: Role,
}

pub(super) async fn set_role<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    AdminUser(admin): AdminUser,
    Path(username): Path<String>,
    Json(body): Json<RoleBody>,
) -> Result<StatusCode, ApiError> {
    state.system.set_role(&admin, &username, body.role).await?;
    Ok(StatusCode::NO_CONTENT)
}
