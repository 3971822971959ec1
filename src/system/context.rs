//! In-memory view of settings and last activity.
//!
//! Loaded once at startup and kept current by [`Refresher`]. Request handlers
//! read it for admission and the countdown instead of querying the store.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use tokio::sync::Notify;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::countdown::{self, Countdown};
use crate::error::{Error, Result};
use crate::fanout::{Broadcaster, Event, QueueUpdate};
use crate::model::settings::Settings;
use crate::model::user::Identity;
use crate::store::Store;
use crate::telemetry::metrics;
use crate::view;

use super::StatusReport;

#[derive(Debug, Clone, Copy, Default)]
struct Values {
    settings: Settings,
    last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct SystemContext {
    values: RwLock<Values>,
}

impl SystemContext {
    pub fn new(settings: Settings, last_activity: Option<DateTime<Utc>>) -> Self {
        Self {
            values: RwLock::new(Values {
                settings,
                last_activity,
            }),
        }
    }

    pub async fn load<S: Store>(store: &S) -> Result<Self> {
        let context = Self::default();
        context.refresh(store).await?;
        Ok(context)
    }

    /// Re-read settings and last activity from the store.
    pub async fn refresh<S: Store>(&self, store: &S) -> Result<()> {
        let settings = store.settings().await?;
        let last_activity = store.last_activity().await?;
        self.write(|v| {
            v.settings = settings;
            v.last_activity = last_activity;
        });
        Ok(())
    }

    /// Install settings this process just saved.
    pub fn apply_settings(&self, settings: Settings) {
        self.write(|v| v.settings = settings);
    }

    /// Take last activity from a queue snapshot.
    pub fn observe(&self, update: &QueueUpdate) {
        let last = view::last_activity(&update.images, &update.history);
        self.write(|v| v.last_activity = last);
    }

    pub fn settings(&self) -> Settings {
        self.read().settings
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.read().last_activity
    }

    pub fn countdown(&self, now: DateTime<Utc>) -> Countdown {
        let v = self.read();
        countdown::evaluate(v.last_activity, v.settings.self_destruct_days, now)
    }

    pub fn status(&self, now: DateTime<Utc>) -> StatusReport {
        let v = self.read();
        StatusReport::new(v.settings, v.last_activity, now)
    }

    /// Decide whether `identity` may use the queue right now.
    ///
    /// A self-destructed system turns everyone away. Maintenance mode turns
    /// away everyone except admins.
    pub fn admit(&self, identity: &Identity, now: DateTime<Utc>) -> Result<()> {
        identity.require_active()?;
        let v = self.read();
        if countdown::evaluate(v.last_activity, v.settings.self_destruct_days, now).destructed {
            metrics::admission_rejections().add(1, &[KeyValue::new("reason", "self_destructed")]);
            return Err(Error::SelfDestructed {
                days: v.settings.self_destruct_days,
            });
        }
        if v.settings.is_maintenance && !identity.role.is_admin() {
            metrics::admission_rejections().add(1, &[KeyValue::new("reason", "maintenance")]);
            return Err(Error::Maintenance);
        }
        Ok(())
    }

    fn read(&self) -> Values {
        *self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, f: impl FnOnce(&mut Values)) {
        let mut guard = self.values.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

/// Background loop that keeps a [`SystemContext`] current.
pub struct Refresher<S> {
    store: Arc<S>,
    context: Arc<SystemContext>,
    events: Broadcaster,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl<S> Clone for Refresher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            context: Arc::clone(&self.context),
            events: self.events.clone(),
            interval: self.interval,
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

impl<S: Store> Refresher<S> {
    pub fn new(
        store: Arc<S>,
        context: Arc<SystemContext>,
        events: Broadcaster,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            context,
            events,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Signal the loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run until shutdown or until the event channel closes.
    pub async fn run(&self) {
        let mut events = self.events.subscribe();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; the context is already loaded.
        ticker.tick().await;

        info!(interval_secs = self.interval.as_secs(), "context refresher started");

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("context refresher shutting down");
                    return;
                }
                event = events.recv() => match event {
                    Ok(Event::QueueUpdated(update)) => self.context.observe(&update),
                    Ok(Event::SystemUpdated(_)) => self.refresh().await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "context refresher lagged behind fan-out");
                        self.refresh().await;
                    }
                    Err(RecvError::Closed) => {
                        info!("fan-out closed, context refresher stopping");
                        return;
                    }
                },
                _ = ticker.tick() => self.refresh().await,
            }
        }
    }

    async fn refresh(&self) {
        match self.context.refresh(self.store.as_ref()).await {
            Ok(()) => debug!("system context refreshed"),
            Err(e) => warn!(error = %e, "system context refresh failed"),
        }
    }
}
