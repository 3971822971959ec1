//! System service: settings, accounts and roles.

pub mod context;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use serde::Serialize;

use crate::auth::{Session, hash_password};
use crate::countdown::{self, Countdown};
use crate::error::{Error, Result};
use crate::fanout::{Event, Notifier, SystemUpdate};
use crate::model::settings::{Settings, SettingsUpdate};
use crate::model::user::{Identity, Role, UserSummary};
use crate::store::Store;
use crate::telemetry::metrics;

pub use context::{Refresher, SystemContext};

/// Public system status: the flags plus the self-destruct countdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub is_maintenance: bool,
    pub self_destruct_days: u32,
    pub countdown: Countdown,
}

impl StatusReport {
    pub fn new(
        settings: Settings,
        last_activity: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            is_maintenance: settings.is_maintenance,
            self_destruct_days: settings.self_destruct_days,
            countdown: countdown::evaluate(last_activity, settings.self_destruct_days, now),
        }
    }
}

/// A freshly authenticated user and the session to hand back.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub identity: Identity,
    pub session: Session,
}

pub struct System<S, N> {
    store: Arc<S>,
    notifier: N,
}

impl<S, N: Clone> Clone for System<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S: Store, N: Notifier> System<S, N> {
    pub fn new(store: Arc<S>, notifier: N) -> Self {
        Self { store, notifier }
    }

    /// Current settings, initialised to the defaults on first access.
    pub async fn settings(&self) -> Result<Settings> {
        self.store.settings().await
    }

    /// Apply a partial settings update. Admin only.
    pub async fn update_settings(
        &self,
        actor: &Identity,
        update: SettingsUpdate,
    ) -> Result<Settings> {
        actor.require_admin()?;
        let next = update.apply(self.store.settings().await?)?;
        self.store.save_settings(&next).await?;
        tracing::info!(
            actor = %actor.username,
            is_maintenance = next.is_maintenance,
            self_destruct_days = next.self_destruct_days,
            "settings updated"
        );
        self.notify().await;
        Ok(next)
    }

    /// Create an account. The very first account becomes the admin.
    pub async fn register(&self, username: &str, password: &str) -> Result<SignedIn> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::Validation("username must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(Error::Validation("password must not be empty".to_string()));
        }

        let hash = hash_password(password);
        let user = self
            .store
            .register_user(username, &hash)
            .await?
            .ok_or_else(|| Error::UsernameTaken(username.to_string()))?;

        tracing::info!(username = %user.username, role = %user.role, "user registered");
        self.notify().await;
        Ok(SignedIn {
            identity: user.identity(),
            session: Session::new(user.username, user.password_hash),
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SignedIn> {
        let hash = hash_password(password);
        let user = self
            .store
            .find_user(username.trim())
            .await?
            .filter(|user| user.password_hash == hash)
            .ok_or_else(|| Error::Unauthenticated("invalid username or password".to_string()))?;

        let identity = user.identity();
        identity.require_active()?;
        Ok(SignedIn {
            identity,
            session: Session::new(user.username, user.password_hash),
        })
    }

    /// Check a presented session against the stored account.
    pub async fn verify(&self, session: &Session) -> Result<Identity> {
        let user = self
            .store
            .find_user(&session.username)
            .await?
            .filter(|user| user.password_hash == session.hash)
            .ok_or_else(|| Error::Unauthenticated("session is no longer valid".to_string()))?;

        let identity = user.identity();
        identity.require_active()?;
        Ok(identity)
    }

    /// All accounts in registration order, without password hashes. Admin only.
    pub async fn users(&self, actor: &Identity) -> Result<Vec<UserSummary>> {
        actor.require_admin()?;
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    /// Usernames in registration order, for statistics.
    pub async fn registered_usernames(&self) -> Result<Vec<String>> {
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(|u| u.username).collect())
    }

    /// Change another user's role. Admin only.
    pub async fn set_role(&self, actor: &Identity, username: &str, role: Role) -> Result<()> {
        actor.require_admin()?;
        if actor.username == username {
            return Err(Error::Forbidden(
                "administrators cannot change their own role".to_string(),
            ));
        }
        if !self.store.set_role(username, role).await? {
            return Err(Error::NotFound(format!("user {username}")));
        }
        tracing::info!(actor = %actor.username, username, role = %role, "role changed");
        self.notify().await;
        Ok(())
    }

    /// Status computed straight from the store.
    pub async fn status(&self, now: DateTime<Utc>) -> Result<StatusReport> {
        let settings = self.store.settings().await?;
        let last_activity = self.store.last_activity().await?;
        Ok(StatusReport::new(settings, last_activity, now))
    }

    async fn notify(&self) {
        let label = match self
            .notifier
            .publish(Event::SystemUpdated(SystemUpdate {}))
            .await
        {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!(error = %e, "system notification failed");
                "error"
            }
        };
        metrics::notifications().add(
            1,
            &[
                KeyValue::new("event", "system_updated"),
                KeyValue::new("result", label),
            ],
        );
    }
}
