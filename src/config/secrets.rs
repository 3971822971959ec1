//! Secret handling utilities.
//!
//! Re-exports the secrecy types used for the database URL and the file
//! service password.

pub use secrecy::{ExposeSecret, SecretString};

use super::Config;

impl Config {
    /// Database URL for connecting. Never log the result.
    pub fn expose_database_url(&self) -> &str {
        self.database_url.expose_secret()
    }
}
