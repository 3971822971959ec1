//! Fan-out of state-change events to connected clients.
//!
//! Events carry whole snapshots. Receivers that fall behind skip to the next
//! event and replace their local state with it; nothing is ever merged.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::model::item::{Item, ItemId};

/// Capacity of the in-process broadcast channel.
pub const CHANNEL_CAPACITY: usize = 64;

/// Payload of `queue_updated`: the full active and history sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueUpdate {
    pub images: Vec<Item>,
    pub history: Vec<Item>,
    /// Item whose transition produced this snapshot.
    pub updated_id: Option<ItemId>,
}

/// Payload of `system_updated`. Receivers re-read settings and users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemUpdate {}

/// A fan-out event, encoded as `{"name": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "snake_case")]
pub enum Event {
    QueueUpdated(QueueUpdate),
    SystemUpdated(SystemUpdate),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::QueueUpdated(_) => "queue_updated",
            Event::SystemUpdated(_) => "system_updated",
        }
    }
}

/// Publishes events to whoever is listening.
pub trait Notifier: Send + Sync + 'static {
    fn publish(&self, event: Event) -> impl Future<Output = Result<()>> + Send;
}

/// In-process broadcast hub.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<Event>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

impl Notifier for Broadcaster {
    async fn publish(&self, event: Event) -> Result<()> {
        // No subscribers is not an error: nobody is watching right now.
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            tracing::trace!(event = event.name(), "no fan-out subscribers");
        }
        Ok(())
    }
}
