use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::IssueId;

/// A single field transition recorded against an issue at a point in time.
///
/// Only `field == "status"` entries are ever persisted as a [`StatusChange`];
/// other changelog items are read from the upstream payload but dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogHistory {
    pub changed_at: DateTime<Utc>,
    pub author_display_name: String,
    pub items: Vec<ChangelogItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogItem {
    pub field: String,
    pub from_string: Option<String>,
    pub to_string: Option<String>,
}

impl ChangelogHistory {
    /// Extract the persisted subset: one `StatusChange` per `field == "status"` item.
    pub fn status_changes(&self, issue_key: &str) -> impl Iterator<Item = StatusChange> + '_ {
        let issue_key = issue_key.to_string();
        self.items.iter().filter(|item| item.field == "status").map(move |item| StatusChange {
            issue_key: issue_key.clone(),
            author_display_name: self.author_display_name.clone(),
            changed_at: self.changed_at,
            from_status: item.from_string.clone().unwrap_or_default(),
            to_status: item.to_string.clone().unwrap_or_default(),
        })
    }
}

/// A persisted `field == "status"` changelog item.
///
/// Uniqueness is `(issue_id, changed_at, from_status, to_status)`, matching
/// the `status_changes` table's unique index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub issue_key: String,
    pub author_display_name: String,
    pub changed_at: DateTime<Utc>,
    pub from_status: String,
    pub to_status: String,
}

/// A status change as read back from storage, with resolved foreign keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedStatusChange {
    pub issue_id: IssueId,
    pub author_id: crate::ids::AuthorId,
    pub changed_at: DateTime<Utc>,
    pub from_status: String,
    pub to_status: String,
}
