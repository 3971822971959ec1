//! Queue service: item lifecycle on top of a store and a notifier.
//!
//! Every mutation checks the actor first, applies the transition rules from
//! [`machine`], persists, and on success publishes exactly one
//! `queue_updated` snapshot. Idempotent repeats succeed silently. Failing to
//! notify is logged and counted but never fails the mutation.

pub mod machine;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use opentelemetry::KeyValue;
use tracing::Instrument as _;

use crate::error::{Error, Result};
use crate::fanout::{Event, Notifier, QueueUpdate};
use crate::model::item::{Item, ItemId, NewItem, Status};
use crate::model::user::Identity;
use crate::store::{ItemStore, Located};
use crate::telemetry::{self, metrics};
use crate::view::{self, Stats};

use machine::Step;

/// How concurrent claims on the same item are arbitrated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClaimPolicy {
    /// Unconditional write after the in-memory check. Two claimants racing
    /// between a read and a write may both succeed; the next snapshot shows
    /// who actually holds the item.
    #[default]
    LastWriteWins,
    /// The write only lands while the item is still unclaimed.
    Conditional,
}

impl ClaimPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            ClaimPolicy::Conditional
        } else {
            ClaimPolicy::LastWriteWins
        }
    }
}

/// Result of a transition body: the value to return and whether anything changed.
struct Applied<T> {
    value: T,
    changed: bool,
}

impl<T> Applied<T> {
    fn changed(value: T) -> Self {
        Self {
            value,
            changed: true,
        }
    }

    fn unchanged(value: T) -> Self {
        Self {
            value,
            changed: false,
        }
    }
}

pub struct Queue<S, N> {
    store: Arc<S>,
    notifier: N,
    policy: ClaimPolicy,
}

impl<S, N: Clone> Clone for Queue<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: self.notifier.clone(),
            policy: self.policy,
        }
    }
}

impl<S: ItemStore, N: Notifier> Queue<S, N> {
    pub fn new(store: Arc<S>, notifier: N, policy: ClaimPolicy) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> ClaimPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Add a new item to the active set as `queued`.
    pub async fn create(&self, actor: &Identity, new: NewItem) -> Result<Item> {
        actor.require_active()?;
        new.validate()?;
        let item = Item::queued(new, actor.username.clone(), Utc::now());
        let id = item.id;

        let created = self
            .transition("create", id, actor, async move {
                self.store.insert_item(&item).await?;
                Ok(Applied::changed(item))
            })
            .await?;

        metrics::items_created().add(1, &[]);
        tracing::info!(item.id = %id, item.name = %created.name, uploaded_by = %actor.username, "item created");
        Ok(created)
    }

    /// Claim an item for `actor`.
    pub async fn claim(&self, actor: &Identity, id: ItemId) -> Result<Item> {
        actor.require_active()?;
        self.transition("claim", id, actor, async move {
            let found = self.locate(id).await?;
            match machine::claim(&found, actor, Utc::now())? {
                Step::Noop => Ok(Applied::unchanged(found.into_item())),
                Step::Apply(claim) => {
                    let strict = self.policy == ClaimPolicy::Conditional;
                    if !self.store.save_claim(id, Some(&claim), strict).await? {
                        return Err(self.conflict(id, Status::InProgress).await);
                    }
                    Ok(Applied::changed(found.into_item().with_claim(Some(claim))))
                }
            }
        })
        .await
    }

    /// Release a claim, returning the item to `queued`.
    pub async fn unclaim(&self, actor: &Identity, id: ItemId) -> Result<Item> {
        actor.require_active()?;
        self.transition("unclaim", id, actor, async move {
            let found = self.locate(id).await?;
            match machine::unclaim(&found, actor)? {
                Step::Noop => Ok(Applied::unchanged(found.into_item())),
                Step::Apply(()) => {
                    if !self.store.save_claim(id, None, false).await? {
                        return Err(self.conflict(id, Status::Queued).await);
                    }
                    Ok(Applied::changed(found.into_item().with_claim(None)))
                }
            }
        })
        .await
    }

    /// Complete an in-progress item, moving it into history.
    pub async fn complete(&self, actor: &Identity, id: ItemId, notes: &str) -> Result<Item> {
        actor.require_active()?;
        self.transition("complete", id, actor, async move {
            let found = self.locate(id).await?;
            let completion = machine::complete(&found, actor, notes, Utc::now())?;
            match self.store.complete_item(id, &completion).await? {
                Some(done) => Ok(Applied::changed(done)),
                None => Err(self.conflict(id, Status::Completed).await),
            }
        })
        .await
    }

    /// Remove an item from whichever collection holds it.
    ///
    /// Deleting an unknown id succeeds and returns `false`.
    pub async fn delete(&self, actor: &Identity, id: ItemId) -> Result<bool> {
        actor.require_active()?;
        self.transition("delete", id, actor, async move {
            let removed = self.store.delete_item(id).await?;
            Ok(Applied {
                value: removed,
                changed: removed,
            })
        })
        .await
    }

    /// Current state, shaped like a `queue_updated` payload without an id.
    pub async fn snapshot(&self) -> Result<QueueUpdate> {
        let images = view::active_view(self.store.list_active().await?);
        let history = self.store.list_history().await?;
        Ok(QueueUpdate {
            images,
            history,
            updated_id: None,
        })
    }

    /// Statistics over both collections. `registered` is the user list in
    /// registration order.
    pub async fn stats(&self, registered: &[String]) -> Result<Stats> {
        let snapshot = self.snapshot().await?;
        Ok(Stats::compute(
            &snapshot.images,
            &snapshot.history,
            registered,
        ))
    }

    async fn locate(&self, id: ItemId) -> Result<Located> {
        self.store
            .locate(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("item {id}")))
    }

    /// Explain why a write found nothing to update.
    async fn conflict(&self, id: ItemId, to: Status) -> Error {
        match self.store.locate(id).await {
            Err(e) => e,
            Ok(None) => Error::NotFound(format!("item {id}")),
            Ok(Some(Located::Active(item))) => match item.claimant() {
                Some(by) if to == Status::InProgress => Error::AlreadyClaimed {
                    id,
                    by: by.to_string(),
                },
                _ => Error::InvalidTransition {
                    from: item.status,
                    to,
                },
            },
            Ok(Some(Located::History(item))) => Error::InvalidTransition {
                from: item.status,
                to,
            },
        }
    }

    /// Run one transition inside its span, then notify if anything changed.
    async fn transition<T, F>(
        &self,
        event: &'static str,
        id: ItemId,
        actor: &Identity,
        body: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<Applied<T>>>,
    {
        let span = telemetry::queue::start_transition_span(event, &id, &actor.username);
        let started = Instant::now();

        let result = async {
            let applied = body.await?;
            if applied.changed {
                self.notify(id).await;
            }
            Ok(applied)
        }
        .instrument(span.clone())
        .await;

        let outcome = match &result {
            Ok(applied) if applied.changed => "applied",
            Ok(_) => "noop",
            Err(_) => "rejected",
        };
        telemetry::queue::record_transition(&span, outcome);
        metrics::transitions().add(
            1,
            &[
                KeyValue::new("event", event),
                KeyValue::new("result", outcome),
            ],
        );
        metrics::operation_duration_ms().record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", format!("queue.{event}"))],
        );

        if let Err(e) = &result {
            tracing::debug!(event, item.id = %id, error = %e, "transition rejected");
        }
        result.map(|applied| applied.value)
    }

    /// Publish the full snapshot after a change. Failures stop here.
    async fn notify(&self, id: ItemId) {
        let result = async {
            let mut update = self.snapshot().await?;
            update.updated_id = Some(id);
            self.notifier.publish(Event::QueueUpdated(update)).await
        }
        .await;

        let label = match result {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!(item.id = %id, error = %e, "queue notification failed");
                "error"
            }
        };
        metrics::notifications().add(
            1,
            &[
                KeyValue::new("event", "queue_updated"),
                KeyValue::new("result", label),
            ],
        );
    }
}
