//! Password hashing and the session cookie.
//!
//! Sessions are stateless: the cookie carries the username and the stored
//! password hash, and every request re-checks both against the users table.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Cookie name shared with existing browser sessions.
pub const SESSION_COOKIE: &str = "hubqueue_session";

/// Session lifetime: seven days.
pub const SESSION_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Hex SHA-256 of the password.
///
/// Unsalted, matching the hashes already stored for existing accounts.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Credentials a client presents on each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub hash: String,
}

impl Session {
    pub fn new(username: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            hash: hash.into(),
        }
    }

    /// Cookie value: hex-encoded username, a dot, then the hash.
    ///
    /// Hex keeps arbitrary usernames inside the cookie-safe alphabet.
    pub fn encode(&self) -> String {
        format!("{}.{}", hex::encode(self.username.as_bytes()), self.hash)
    }

    pub fn decode(value: &str) -> Result<Self> {
        let malformed = || Error::Unauthenticated("malformed session cookie".to_string());
        let (user_hex, hash) = value.trim().split_once('.').ok_or_else(malformed)?;
        let bytes = hex::decode(user_hex).map_err(|_| malformed())?;
        let username = String::from_utf8(bytes).map_err(|_| malformed())?;
        if username.is_empty() || hash.is_empty() {
            return Err(malformed());
        }
        Ok(Self::new(username, hash))
    }

    /// Full `Set-Cookie` header value.
    pub fn set_cookie(&self) -> String {
        format!(
            "{SESSION_COOKIE}={}; Path=/; Max-Age={SESSION_MAX_AGE_SECS}; HttpOnly; SameSite=Lax",
            self.encode()
        )
    }

    /// `Set-Cookie` header value that removes the session.
    pub fn clear_cookie() -> String {
        format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
    }

    /// Pull the session out of a `Cookie` request header.
    pub fn from_cookie_header(header: &str) -> Option<Result<Self>> {
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| Self::decode(value))
    }
}
