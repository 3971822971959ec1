//! # hubqueue
//!
//! Collaborative image-processing task queue.
//!
//! Users upload images to a shared pool, claim items to work on and complete
//! them with notes. An admin panel tracks throughput and per-user statistics,
//! and an inactivity countdown ("self-destruct") runs from the most recent
//! upload or completion. Postgres (sqlx) is the source of truth, a tokio
//! broadcast hub fans queue snapshots out to connected clients, and payloads
//! live on a WebDAV file service behind an image proxy.

pub mod auth;
pub mod config;
pub mod countdown;
pub mod db;
pub mod error;
pub mod fanout;
pub mod filestore;
pub mod model;
pub mod queue;
pub mod server;
pub mod store;
pub mod system;
pub mod telemetry;
pub mod view;
