//! Views derived from the full item set: the active queue, activity
//! timestamps and per-user statistics for the admin panel.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::item::{Item, Status};

/// Active set as shown to users.
///
/// Completed items should never be in the active set; they are filtered out
/// anyway in case the store ever disagrees.
pub fn active_view(items: Vec<Item>) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| item.status != Status::Completed)
        .collect()
}

/// Most recent upload (active set) or completion (history set).
pub fn last_activity(active: &[Item], history: &[Item]) -> Option<DateTime<Utc>> {
    let uploads = active.iter().map(|item| item.created_at);
    let completions = history
        .iter()
        .filter_map(|item| item.completion.as_ref().map(|c| c.at));
    uploads.chain(completions).max()
}

/// Contribution counters for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub uploaded: u64,
    pub completed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntry {
    pub username: String,
    #[serde(flatten)]
    pub stats: UserStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub username: String,
    #[serde(flatten)]
    pub stats: UserStats,
}

/// Aggregate statistics over active and history sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_uploaded: u64,
    pub total_completed: u64,
    /// One entry per user, in enumeration order.
    pub users: Vec<UserEntry>,
}

impl Stats {
    /// Compute statistics.
    ///
    /// `registered` lists known usernames in registration order; they come
    /// first in the enumeration, followed by any other uploader or completer
    /// in order of first appearance.
    pub fn compute(active: &[Item], history: &[Item], registered: &[String]) -> Self {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut users: Vec<UserEntry> = Vec::new();

        let mut slot = |name: &str| -> usize {
            if let Some(&i) = index.get(name) {
                return i;
            }
            users.push(UserEntry {
                username: name.to_string(),
                stats: UserStats::default(),
            });
            index.insert(name.to_string(), users.len() - 1);
            users.len() - 1
        };

        for name in registered {
            slot(name);
        }

        let mut uploads = Vec::with_capacity(active.len() + history.len());
        let mut completions = Vec::with_capacity(history.len());
        for item in active.iter().chain(history) {
            uploads.push(slot(&item.uploaded_by));
            if let Some(done) = &item.completion {
                completions.push(slot(&done.by));
            }
        }

        for i in uploads {
            users[i].stats.uploaded += 1;
        }
        for i in completions {
            users[i].stats.completed += 1;
        }

        Self {
            total_uploaded: (active.len() + history.len()) as u64,
            total_completed: history.len() as u64,
            users,
        }
    }

    /// Counters for `username`; zero for users that never showed up.
    pub fn user(&self, username: &str) -> UserStats {
        self.users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.stats)
            .unwrap_or_default()
    }

    /// Users by completed count, descending. Ties keep enumeration order.
    pub fn leaderboard(&self) -> Vec<LeaderboardRow> {
        let mut ranked: Vec<&UserEntry> = self.users.iter().collect();
        ranked.sort_by(|a, b| b.stats.completed.cmp(&a.stats.completed));
        ranked
            .into_iter()
            .enumerate()
            .map(|(i, entry)| LeaderboardRow {
                rank: i + 1,
                username: entry.username.clone(),
                stats: entry.stats,
            })
            .collect()
    }
}
