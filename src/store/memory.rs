//! In-process store used by tests and embedders.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::item::{Claim, Completion, Item, ItemId, Status};
use crate::model::settings::Settings;
use crate::model::user::{Role, User};

use super::{ItemStore, Located, SystemStore};

#[derive(Debug, Default)]
struct State {
    active: Vec<Item>,
    history: Vec<Item>,
    settings: Option<Settings>,
    users: Vec<User>,
}

/// Store backed by vectors behind one mutex.
///
/// Every operation takes the lock once, so a move into history is never
/// observable halfway.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Other("memory store lock poisoned".to_string()))
    }
}

impl ItemStore for MemoryStore {
    async fn insert_item(&self, item: &Item) -> Result<()> {
        let mut state = self.lock()?;
        if state.active.iter().chain(&state.history).any(|i| i.id == item.id) {
            return Err(Error::Other(format!("duplicate item id {}", item.id)));
        }
        state.active.push(item.clone());
        Ok(())
    }

    async fn locate(&self, id: ItemId) -> Result<Option<Located>> {
        let state = self.lock()?;
        if let Some(item) = state.active.iter().find(|i| i.id == id) {
            return Ok(Some(Located::Active(item.clone())));
        }
        Ok(state
            .history
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .map(Located::History))
    }

    async fn save_claim(
        &self,
        id: ItemId,
        claim: Option<&Claim>,
        require_unclaimed: bool,
    ) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(slot) = state.active.iter_mut().find(|i| i.id == id) else {
            return Ok(false);
        };
        if require_unclaimed && slot.claim.is_some() {
            return Ok(false);
        }
        let item = slot.clone().with_claim(claim.cloned());
        *slot = item;
        Ok(true)
    }

    async fn complete_item(&self, id: ItemId, completion: &Completion) -> Result<Option<Item>> {
        let mut state = self.lock()?;
        let Some(pos) = state
            .active
            .iter()
            .position(|i| i.id == id && i.status == Status::InProgress)
        else {
            return Ok(None);
        };
        let done = state.active.remove(pos).into_completed(completion.clone());
        state.history.push(done.clone());
        Ok(Some(done))
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        let mut state = self.lock()?;
        let before = state.active.len() + state.history.len();
        state.active.retain(|i| i.id != id);
        state.history.retain(|i| i.id != id);
        Ok(state.active.len() + state.history.len() != before)
    }

    async fn list_active(&self) -> Result<Vec<Item>> {
        let mut items = self.lock()?.active.clone();
        // Insertion order breaks ties between equal timestamps: newest first.
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn list_history(&self) -> Result<Vec<Item>> {
        let mut items = self.lock()?.history.clone();
        items.reverse();
        items.sort_by_key(|i| std::cmp::Reverse(i.completion.as_ref().map(|c| c.at)));
        Ok(items)
    }

    async fn last_activity(&self) -> Result<Option<DateTime<Utc>>> {
        let state = self.lock()?;
        Ok(crate::view::last_activity(&state.active, &state.history))
    }
}

impl SystemStore for MemoryStore {
    async fn settings(&self) -> Result<Settings> {
        let mut state = self.lock()?;
        Ok(*state.settings.get_or_insert_with(Settings::default))
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.lock()?.settings = Some(*settings);
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.lock()?.users.clone())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn register_user(&self, username: &str, password_hash: &str) -> Result<Option<User>> {
        let mut state = self.lock()?;
        if state.users.iter().any(|u| u.username == username) {
            return Ok(None);
        }
        let role = if state.users.is_empty() {
            Role::Admin
        } else {
            Role::User
        };
        let user = User {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
        };
        state.users.push(user.clone());
        Ok(Some(user))
    }

    async fn set_role(&self, username: &str, role: Role) -> Result<bool> {
        let mut state = self.lock()?;
        match state.users.iter_mut().find(|u| u.username == username) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
