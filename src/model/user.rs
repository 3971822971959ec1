//! Users, roles and verified identities.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A registered account as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Access level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Trusted,
    User,
    Banned,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Admins and trusted users may release claims held by others.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::Trusted)
    }

    pub fn is_banned(self) -> bool {
        matches!(self, Role::Banned)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Trusted => "trusted",
            Role::User => "user",
            Role::Banned => "banned",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "trusted" => Ok(Role::Trusted),
            "user" => Ok(Role::User),
            "banned" => Ok(Role::Banned),
            other => Err(Error::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// A verified actor. Every queue and admin operation takes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: Role,
}

impl Identity {
    /// Username the CLI acts under.
    pub const OPERATOR: &'static str = "operator";

    /// Built-in admin identity for local operator commands.
    pub fn operator() -> Self {
        Self {
            username: Self::OPERATOR.to_string(),
            role: Role::Admin,
        }
    }

    /// Reject banned actors.
    pub fn require_active(&self) -> Result<()> {
        if self.role.is_banned() {
            return Err(Error::Forbidden(format!("user {} is banned", self.username)));
        }
        Ok(())
    }

    pub fn require_admin(&self) -> Result<()> {
        if !self.role.is_admin() {
            return Err(Error::Forbidden(format!(
                "user {} is not an administrator",
                self.username
            )));
        }
        Ok(())
    }
}

/// What the admin panel shows for a user. Never carries the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            role: user.role,
        }
    }
}
