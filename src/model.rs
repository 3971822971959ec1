//! Core data model.
//!
//! A task item is one uploaded image waiting to be processed. It lives in the
//! active set while `queued` or `in-progress` and moves to the history set
//! once `completed`. Settings and users are the two process-wide records the
//! admin panel manages.

pub mod item;
pub mod settings;
pub mod user;
