//! Active and history tables.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::item::{Claim, Completion, Item, ItemId, Status};
use crate::store::{ItemStore, Located};

const ACTIVE_COLUMNS: &str =
    "id, name, storage_ref, status, uploaded_by, claimed_by, claimed_at, created_at";

const HISTORY_COLUMNS: &str = "id, name, storage_ref, uploaded_by, claimed_at, created_at, \
     completed_by, completed_at, completion_notes";

impl ItemStore for super::Db {
    async fn insert_item(&self, item: &Item) -> Result<()> {
        sqlx::query(
            "INSERT INTO items (id, name, storage_ref, status, uploaded_by, claimed_by, claimed_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(item.id.0)
        .bind(&item.name)
        .bind(&item.storage_ref)
        .bind(item.status.as_str())
        .bind(&item.uploaded_by)
        .bind(item.claim.as_ref().map(|c| c.by.as_str()))
        .bind(item.claim.as_ref().map(|c| c.at))
        .bind(item.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn locate(&self, id: ItemId) -> Result<Option<Located>> {
        let active: Option<ActiveRow> =
            sqlx::query_as(&format!("SELECT {ACTIVE_COLUMNS} FROM items WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(self.pool())
                .await?;
        if let Some(row) = active {
            return Ok(Some(Located::Active(row.try_into_item()?)));
        }

        let done: Option<HistoryRow> =
            sqlx::query_as(&format!("SELECT {HISTORY_COLUMNS} FROM history WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(self.pool())
                .await?;
        Ok(done.map(|row| Located::History(row.into_item())))
    }

    async fn save_claim(
        &self,
        id: ItemId,
        claim: Option<&Claim>,
        require_unclaimed: bool,
    ) -> Result<bool> {
        let status = if claim.is_some() {
            Status::InProgress
        } else {
            Status::Queued
        };
        let sql = if require_unclaimed {
            "UPDATE items SET status = $1, claimed_by = $2, claimed_at = $3
             WHERE id = $4 AND claimed_by IS NULL"
        } else {
            "UPDATE items SET status = $1, claimed_by = $2, claimed_at = $3
             WHERE id = $4"
        };
        let rows_affected = sqlx::query(sql)
            .bind(status.as_str())
            .bind(claim.map(|c| c.by.as_str()))
            .bind(claim.map(|c| c.at))
            .bind(id.0)
            .execute(self.pool())
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    async fn complete_item(&self, id: ItemId, completion: &Completion) -> Result<Option<Item>> {
        // Delete and insert in one statement: readers see the item in exactly
        // one table at every point in time.
        let row: Option<HistoryRow> = sqlx::query_as(&format!(
            "WITH moved AS (
                 DELETE FROM items WHERE id = $1 AND status = 'in-progress'
                 RETURNING id, name, storage_ref, uploaded_by, claimed_at, created_at
             )
             INSERT INTO history (id, name, storage_ref, status, uploaded_by, claimed_at, created_at,
                                  completed_by, completed_at, completion_notes)
             SELECT id, name, storage_ref, 'completed', uploaded_by, claimed_at, created_at, $2, $3, $4
             FROM moved
             RETURNING {HISTORY_COLUMNS}"
        ))
        .bind(id.0)
        .bind(&completion.by)
        .bind(completion.at)
        .bind(&completion.notes)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(HistoryRow::into_item))
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        let mut tx = self.pool().begin().await?;
        let active = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let done = sqlx::query("DELETE FROM history WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(active + done > 0)
    }

    async fn list_active(&self) -> Result<Vec<Item>> {
        let rows: Vec<ActiveRow> = sqlx::query_as(&format!(
            "SELECT {ACTIVE_COLUMNS} FROM items ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(ActiveRow::try_into_item).collect()
    }

    async fn list_history(&self) -> Result<Vec<Item>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(&format!(
            "SELECT {HISTORY_COLUMNS} FROM history ORDER BY completed_at DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(HistoryRow::into_item).collect())
    }

    async fn last_activity(&self) -> Result<Option<DateTime<Utc>>> {
        // GREATEST ignores NULLs, so one empty table does not hide the other.
        let (latest,): (Option<DateTime<Utc>>,) = sqlx::query_as(
            "SELECT GREATEST(
                 (SELECT max(created_at) FROM items),
                 (SELECT max(completed_at) FROM history)
             )",
        )
        .fetch_one(self.pool())
        .await?;
        Ok(latest)
    }
}

/// Internal row type for the `items` table.
#[derive(sqlx::FromRow)]
struct ActiveRow {
    id: Uuid,
    name: String,
    storage_ref: String,
    status: String,
    uploaded_by: String,
    claimed_by: Option<String>,
    claimed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ActiveRow {
    fn try_into_item(self) -> Result<Item> {
        let status: Status = self.status.parse()?;
        let claim = match (self.claimed_by, self.claimed_at) {
            (Some(by), Some(at)) => Some(Claim { by, at }),
            _ => None,
        };
        if (status == Status::InProgress) != claim.is_some() {
            return Err(Error::Other(format!(
                "item {} is {status} but claim fields disagree",
                self.id
            )));
        }
        Ok(Item {
            id: ItemId(self.id),
            name: self.name,
            storage_ref: self.storage_ref,
            status,
            uploaded_by: self.uploaded_by,
            claim,
            completion: None,
            created_at: self.created_at,
        })
    }
}

/// Internal row type for the `history` table.
#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    name: String,
    storage_ref: String,
    uploaded_by: String,
    claimed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    completed_by: String,
    completed_at: DateTime<Utc>,
    completion_notes: String,
}

impl HistoryRow {
    fn into_item(self) -> Item {
        Item {
            id: ItemId(self.id),
            name: self.name,
            storage_ref: self.storage_ref,
            status: Status::Completed,
            uploaded_by: self.uploaded_by,
            claim: None,
            completion: Some(Completion {
                by: self.completed_by,
                at: self.completed_at,
                notes: self.completion_notes,
                claimed_at: self.claimed_at,
            }),
            created_at: self.created_at,
        }
    }
}
