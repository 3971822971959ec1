//! Task items and their lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A unit of work: one image in the shared pool.
///
/// Serialized flat, the way clients know it: `claimedBy`/`claimedAt` while
/// in progress, `completedBy`/`completedAt`/`completionNotes` once completed,
/// plus a `url` pointing at the image proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ItemWire", into = "ItemWire")]
pub struct Item {
    /// Unique identifier, kept when the item moves to history.
    pub id: ItemId,

    /// Display name (usually the original file name).
    pub name: String,

    /// Reference to the payload in the file store. Opaque to the queue.
    pub storage_ref: String,

    /// Current lifecycle state.
    pub status: Status,

    /// Username of the uploader.
    pub uploaded_by: String,

    /// Present iff `status` is `in-progress`.
    pub claim: Option<Claim>,

    /// Present iff `status` is `completed`.
    pub completion: Option<Completion>,

    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Build a freshly created, unclaimed item.
    pub fn queued(new: NewItem, uploaded_by: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: ItemId::new(),
            name: new.name,
            storage_ref: new.storage_ref,
            status: Status::Queued,
            uploaded_by: uploaded_by.into(),
            claim: None,
            completion: None,
            created_at: now,
        }
    }

    /// Replace the claim; status follows the claim so both always agree.
    pub fn with_claim(mut self, claim: Option<Claim>) -> Self {
        self.status = if claim.is_some() {
            Status::InProgress
        } else {
            Status::Queued
        };
        self.claim = claim;
        self
    }

    /// Turn an active item into its history record.
    pub fn into_completed(mut self, completion: Completion) -> Self {
        self.status = Status::Completed;
        self.claim = None;
        self.completion = Some(completion);
        self
    }

    /// Username currently holding the item, if any.
    pub fn claimant(&self) -> Option<&str> {
        self.claim.as_ref().map(|c| c.by.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Newtype for item IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| Error::Validation(format!("bad item id {s:?}: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// In the active set, nobody working on it.
    Queued,
    /// In the active set, held by a claimant.
    InProgress,
    /// In the history set. Terminal.
    Completed,
}

impl Status {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (Queued, InProgress) | (InProgress, Queued) | (InProgress, Completed)
        )
    }

    /// Is this a terminal state?
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed)
    }

    /// Does an item in this state belong to the active set?
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(Status::Queued),
            "in-progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            other => Err(Error::Other(format!("unknown item status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Claim / Completion
// ---------------------------------------------------------------------------

/// Who is working on an item and since when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub by: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
}

/// Completion record written when an item moves to history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub by: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
    pub notes: String,
    /// When the last claim before completion was taken.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub claimed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

/// JSON form of [`Item`]. Claim and completion fields sit at the top level.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemWire {
    id: ItemId,
    name: String,
    storage_ref: String,
    status: Status,
    uploaded_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    claimed_by: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    claimed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_by: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completion_notes: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    /// Output only.
    #[serde(default, skip_deserializing)]
    url: String,
}

impl From<Item> for ItemWire {
    fn from(item: Item) -> Self {
        let url = proxy_url(&item.storage_ref);
        let (claimed_by, mut claimed_at) = match item.claim {
            Some(claim) => (Some(claim.by), Some(claim.at)),
            None => (None, None),
        };
        let (completed_by, completed_at, completion_notes) = match item.completion {
            Some(done) => {
                claimed_at = claimed_at.or(done.claimed_at);
                (Some(done.by), Some(done.at), Some(done.notes))
            }
            None => (None, None, None),
        };
        Self {
            id: item.id,
            name: item.name,
            storage_ref: item.storage_ref,
            status: item.status,
            uploaded_by: item.uploaded_by,
            claimed_by,
            claimed_at,
            completed_by,
            completed_at,
            completion_notes,
            created_at: item.created_at,
            url,
        }
    }
}

impl From<ItemWire> for Item {
    fn from(wire: ItemWire) -> Self {
        let claim = match (wire.status, wire.claimed_by, wire.claimed_at) {
            (Status::InProgress, Some(by), Some(at)) => Some(Claim { by, at }),
            _ => None,
        };
        let completion = match (wire.status, wire.completed_by, wire.completed_at) {
            (Status::Completed, Some(by), Some(at)) => Some(Completion {
                by,
                at,
                notes: wire.completion_notes.unwrap_or_default(),
                claimed_at: wire.claimed_at,
            }),
            _ => None,
        };
        Self {
            id: wire.id,
            name: wire.name,
            storage_ref: wire.storage_ref,
            status: wire.status,
            uploaded_by: wire.uploaded_by,
            claim,
            completion,
            created_at: wire.created_at,
        }
    }
}

/// Proxy URL clients use to load a stored payload.
pub fn proxy_url(storage_ref: &str) -> String {
    reqwest::Url::parse_with_params("http://hubqueue/api/image", [("path", storage_ref)])
        .map(|url| format!("{}?{}", url.path(), url.query().unwrap_or_default()))
        .unwrap_or_else(|_| format!("/api/image?path={storage_ref}"))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Parameters for creating a new item. The uploader comes from the acting identity.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub(crate) name: String,
    pub(crate) storage_ref: String,
}

impl NewItem {
    pub fn new(name: impl Into<String>, storage_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_ref: storage_ref.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("item name must not be empty".to_string()));
        }
        if self.storage_ref.trim().is_empty() {
            return Err(Error::Validation(
                "item storage reference must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 10, minute, 0).unwrap()
    }

    fn item() -> Item {
        Item::queued(NewItem::new("cat.png", "/uploads/abc-cat.png"), "alice", at(0))
    }

    #[test]
    fn claimed_item_uses_flat_claim_fields() {
        let claimed = item().with_claim(Some(Claim {
            by: "bob".to_string(),
            at: at(5),
        }));
        let json = serde_json::to_value(&claimed).unwrap();

        assert_eq!(json["status"], "in-progress");
        assert_eq!(json["uploadedBy"], "alice");
        assert_eq!(json["storageRef"], "/uploads/abc-cat.png");
        assert_eq!(json["claimedBy"], "bob");
        assert_eq!(json["claimedAt"], at(5).timestamp_millis());
        assert_eq!(json["createdAt"], at(0).timestamp_millis());
        assert_eq!(json["url"], "/api/image?path=%2Fuploads%2Fabc-cat.png");
        assert!(json.get("claim").is_none());
        assert!(json.get("completedBy").is_none());

        let back: Item = serde_json::from_value(json).unwrap();
        assert_eq!(back, claimed);
    }

    #[test]
    fn completed_item_uses_flat_completion_fields() {
        let done = item().into_completed(Completion {
            by: "bob".to_string(),
            at: at(9),
            notes: "cropped".to_string(),
            claimed_at: Some(at(5)),
        });
        let json = serde_json::to_value(&done).unwrap();

        assert_eq!(json["status"], "completed");
        assert_eq!(json["completedBy"], "bob");
        assert_eq!(json["completedAt"], at(9).timestamp_millis());
        assert_eq!(json["completionNotes"], "cropped");
        assert_eq!(json["claimedAt"], at(5).timestamp_millis());
        assert!(json.get("claimedBy").is_none());
        assert!(json.get("completion").is_none());

        let back: Item = serde_json::from_value(json).unwrap();
        assert_eq!(back, done);
    }

    #[test]
    fn queued_item_has_no_claim_or_completion_fields() {
        let json = serde_json::to_value(item()).unwrap();
        for key in ["claimedBy", "claimedAt", "completedBy", "completedAt", "completionNotes"] {
            assert!(json.get(key).is_none(), "{key} present");
        }
    }
}
