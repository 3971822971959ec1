//! Settings singleton and user accounts.

use sqlx::types::Json;

use crate::error::Result;
use crate::model::settings::Settings;
use crate::model::user::{Role, User};
use crate::store::SystemStore;

const SETTINGS_KEY: &str = "settings";

impl SystemStore for super::Db {
    async fn settings(&self) -> Result<Settings> {
        // Insert the defaults if the key is missing, then read whatever won.
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(SETTINGS_KEY)
        .bind(Json(Settings::default()))
        .execute(self.pool())
        .await?;

        let (Json(settings),): (Json<Settings>,) =
            sqlx::query_as("SELECT value FROM settings WHERE key = $1")
                .bind(SETTINGS_KEY)
                .fetch_one(self.pool())
                .await?;
        Ok(settings)
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(SETTINGS_KEY)
        .bind(Json(*settings))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT username, password_hash, role FROM users ORDER BY created_at, username",
        )
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(UserRow::try_into_user).collect()
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT username, password_hash, role FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(self.pool())
                .await?;
        row.map(UserRow::try_into_user).transpose()
    }

    async fn register_user(&self, username: &str, password_hash: &str) -> Result<Option<User>> {
        let mut tx = self.pool().begin().await?;

        // Serialise registrations so exactly one first user becomes admin.
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let row: Option<UserRow> = sqlx::query_as(
            "INSERT INTO users (username, password_hash, role)
             VALUES ($1, $2, CASE WHEN EXISTS (SELECT 1 FROM users) THEN 'user' ELSE 'admin' END)
             ON CONFLICT (username) DO NOTHING
             RETURNING username, password_hash, role",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        row.map(UserRow::try_into_user).transpose()
    }

    async fn set_role(&self, username: &str, role: Role) -> Result<bool> {
        let rows_affected = sqlx::query("UPDATE users SET role = $1 WHERE username = $2")
            .bind(role.as_str())
            .bind(username)
            .execute(self.pool())
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    password_hash: String,
    role: String,
}

impl UserRow {
    fn try_into_user(self) -> Result<User> {
        Ok(User {
            username: self.username,
            password_hash: self.password_hash,
            role: self.role.parse()?,
        })
    }
}
