use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::changelog::ChangelogHistory;
use crate::ids::IssueId;

/// A single issue belonging to exactly one project.
///
/// `creator_display_name` and `assignee_display_name` reference [`Author`]s
/// by natural key; `assignee_display_name` is nullable all the way to the
/// nullable `assignee_id` foreign key column, rather than coding "no
/// assignee" as a sentinel id.
///
/// [`Author`]: crate::author::Author
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: Option<IssueId>,
    pub key: String,
    pub project_key: String,
    pub creator_display_name: String,
    pub assignee_display_name: Option<String>,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub priority: String,
    pub status: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub closed: Option<DateTime<Utc>>,
    pub time_spent_seconds: Option<i64>,
    pub history: Vec<ChangelogHistory>,
}

impl Issue {
    /// Every display name referenced by this issue: creator, assignee (if
    /// any), and every changelog author. Used by the author dedup pre-pass
    /// before issues and status changes are upserted.
    pub fn referenced_author_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.creator_display_name.as_str())
            .chain(self.assignee_display_name.as_deref())
            .chain(self.history.iter().map(|h| h.author_display_name.as_str()))
    }
}

/// A slim issue projection for read APIs (resources service), without the
/// full changelog history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSummary {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub priority: String,
    pub issue_type: String,
    pub creator_display_name: String,
    pub assignee_display_name: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub closed: Option<DateTime<Utc>>,
}
