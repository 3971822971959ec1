//! Persisted-store contract.
//!
//! The queue and system services are generic over these traits. [`crate::db::Db`]
//! implements them on Postgres; [`memory::MemoryStore`] implements them in
//! process with the same semantics.

pub mod memory;

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::item::{Claim, Completion, Item, ItemId};
use crate::model::settings::Settings;
use crate::model::user::{Role, User};

/// Where an id was found.
#[derive(Debug, Clone, PartialEq)]
pub enum Located {
    Active(Item),
    History(Item),
}

impl Located {
    pub fn item(&self) -> &Item {
        match self {
            Located::Active(item) | Located::History(item) => item,
        }
    }

    pub fn into_item(self) -> Item {
        match self {
            Located::Active(item) | Located::History(item) => item,
        }
    }
}

/// Active and history collections.
pub trait ItemStore: Send + Sync + 'static {
    /// Add a new item to the active set.
    fn insert_item(&self, item: &Item) -> impl Future<Output = Result<()>> + Send;

    /// Find an id in either collection.
    fn locate(&self, id: ItemId) -> impl Future<Output = Result<Option<Located>>> + Send;

    /// Set or clear the claim of an active item, moving its status along.
    ///
    /// With `require_unclaimed` the write only lands if the item is still
    /// unclaimed. Returns whether a row was written.
    fn save_claim(
        &self,
        id: ItemId,
        claim: Option<&Claim>,
        require_unclaimed: bool,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Move an in-progress item into history in one atomic step.
    ///
    /// Returns the history record, or `None` if no in-progress item with that
    /// id was present at the time of the move.
    fn complete_item(
        &self,
        id: ItemId,
        completion: &Completion,
    ) -> impl Future<Output = Result<Option<Item>>> + Send;

    /// Remove an id from whichever collection holds it.
    fn delete_item(&self, id: ItemId) -> impl Future<Output = Result<bool>> + Send;

    /// Active set, newest upload first.
    fn list_active(&self) -> impl Future<Output = Result<Vec<Item>>> + Send;

    /// History set, most recently completed first.
    fn list_history(&self) -> impl Future<Output = Result<Vec<Item>>> + Send;

    /// Most recent upload or completion across both collections.
    fn last_activity(&self) -> impl Future<Output = Result<Option<DateTime<Utc>>>> + Send;
}

/// Settings singleton and user accounts.
pub trait SystemStore: Send + Sync + 'static {
    /// Load the settings, writing the defaults first if none are stored.
    fn settings(&self) -> impl Future<Output = Result<Settings>> + Send;

    fn save_settings(&self, settings: &Settings) -> impl Future<Output = Result<()>> + Send;

    /// All users in registration order.
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>>> + Send;

    fn find_user(&self, username: &str) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Create an account. The first account ever created gets the admin role.
    ///
    /// Returns `None` if the username is taken.
    fn register_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Returns whether the user existed.
    fn set_role(&self, username: &str, role: Role) -> impl Future<Output = Result<bool>> + Send;
}

/// Everything the services need from persistence.
pub trait Store: ItemStore + SystemStore {}

impl<T: ItemStore + SystemStore> Store for T {}
