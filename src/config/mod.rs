//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing or
//! malformed. Sensitive values wrapped in secrecy::SecretString to prevent
//! log leaks.

pub mod secrets;

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};
use secrecy::SecretString;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9002";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub bind_addr: SocketAddr,
    /// File service credentials. Only `serve` needs them.
    pub webdav: Option<WebDavConfig>,
    /// Use conditional claim writes instead of last-write-wins.
    pub strict_claims: bool,
    /// How often the server re-reads settings and last activity.
    pub refresh_interval: Duration,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct WebDavConfig {
    pub url: String,
    pub username: String,
    pub password: SecretString,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| {
            var(name).ok_or_else(|| {
                Error::Config(format!("required environment variable {name} is not set"))
            })
        };

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("BIND_ADDR is not a socket address: {e}")))?;

        let webdav = match (var("WEBDAV_URL"), var("WEBDAV_USERNAME"), var("WEBDAV_PASSWORD")) {
            (None, None, None) => None,
            (Some(url), Some(username), Some(password)) => Some(WebDavConfig {
                url,
                username,
                password: SecretString::from(password),
            }),
            _ => {
                return Err(Error::Config(
                    "WEBDAV_URL, WEBDAV_USERNAME and WEBDAV_PASSWORD must be set together"
                        .to_string(),
                ));
            }
        };

        let strict_claims = match var("HUBQUEUE_STRICT_CLAIMS") {
            None => false,
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                Error::Config(format!("HUBQUEUE_STRICT_CLAIMS is not a boolean: {raw}"))
            })?,
        };

        let refresh_secs = match var("REFRESH_INTERVAL_SECS") {
            None => DEFAULT_REFRESH_INTERVAL_SECS,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "REFRESH_INTERVAL_SECS must be a positive integer: {raw}"
                    ))
                })?,
        };

        Ok(Self {
            database_url: SecretString::from(required("DATABASE_URL")?),
            bind_addr,
            webdav,
            strict_claims,
            refresh_interval: Duration::from_secs(refresh_secs),
            otel_endpoint: var("OTEL_ENDPOINT"),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// File service settings, required by the server.
    pub fn require_webdav(&self) -> Result<&WebDavConfig> {
        self.webdav.as_ref().ok_or_else(|| {
            Error::Config(
                "WEBDAV_URL, WEBDAV_USERNAME and WEBDAV_PASSWORD are required to serve"
                    .to_string(),
            )
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
