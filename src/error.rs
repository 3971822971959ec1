//! Error types for hubqueue.

use thiserror::Error;

use crate::model::item::{ItemId, Status};

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("item {id} is already claimed by {by}")]
    AlreadyClaimed { id: ItemId, by: String },

    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("username already taken: {0}")]
    UsernameTaken(String),

    #[error("the system is in maintenance mode")]
    Maintenance,

    #[error("the system self-destructed after {days} days without activity")]
    SelfDestructed { days: u32 },

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("file store error: {0}")]
    FileStore(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
