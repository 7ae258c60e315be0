//! Upstream JSON payload shapes.
//!
//! These types exist only to decode upstream responses; callers convert them
//! into `domain` types via the `Into` impls below, which is also where the
//! "only `field == "status"` changelog items survive" rule and the author
//! natural-key choice get applied.

use domain::{ChangelogHistory, ChangelogItem, FlexibleTimestamp, Issue, UpstreamProjectListing};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct IssueSearchResponse {
    pub total: Option<i64>,
    #[serde(default)]
    pub issues: Vec<IssueWire>,
}

#[derive(Debug, Deserialize)]
pub struct IssueWire {
    pub id: String,
    pub key: String,
    pub fields: FieldsWire,
    #[serde(default)]
    pub changelog: ChangelogWire,
}

#[derive(Debug, Deserialize)]
pub struct FieldsWire {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub issuetype: NamedField,
    pub priority: NamedField,
    pub status: NamedField,
    pub creator: UserWire,
    #[serde(default)]
    pub assignee: Option<UserWire>,
    #[serde(default)]
    pub created: FlexibleTimestamp,
    #[serde(default)]
    pub updated: FlexibleTimestamp,
    #[serde(default, rename = "resolutiondate")]
    pub resolution_date: Option<FlexibleTimestamp>,
    #[serde(default)]
    pub timetracking: TimeTrackingWire,
}

#[derive(Debug, Deserialize)]
pub struct NamedField {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserWire {
    #[serde(rename = "accountId", default)]
    pub account_id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimeTrackingWire {
    #[serde(rename = "timeSpentSeconds", default)]
    pub time_spent_seconds: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangelogWire {
    #[serde(default)]
    pub histories: Vec<HistoryWire>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryWire {
    #[serde(default)]
    pub created: FlexibleTimestamp,
    pub author: UserWire,
    #[serde(default)]
    pub items: Vec<ItemWire>,
}

#[derive(Debug, Deserialize)]
pub struct ItemWire {
    pub field: String,
    #[serde(rename = "fromString", default)]
    pub from_string: Option<String>,
    #[serde(rename = "toString", default)]
    pub to_string: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectDetailWire {
    pub id: String,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectListingWire {
    pub id: String,
    pub key: String,
    pub name: String,
}

impl From<ProjectListingWire> for UpstreamProjectListing {
    fn from(w: ProjectListingWire) -> Self {
        UpstreamProjectListing { id: w.id, key: w.key, name: w.name }
    }
}

impl IssueWire {
    pub fn into_domain(self, project_key: &str) -> Issue {
        let history: Vec<ChangelogHistory> = self
            .changelog
            .histories
            .into_iter()
            .map(|h| ChangelogHistory {
                changed_at: h.created.into(),
                author_display_name: h.author.display_name,
                items: h
                    .items
                    .into_iter()
                    .map(|i| ChangelogItem { field: i.field, from_string: i.from_string, to_string: i.to_string })
                    .collect(),
            })
            .collect();

        Issue {
            id: None,
            key: self.key,
            project_key: project_key.to_string(),
            creator_display_name: self.fields.creator.display_name,
            assignee_display_name: self.fields.assignee.map(|u| u.display_name),
            summary: self.fields.summary.unwrap_or_default(),
            description: self.fields.description.unwrap_or_default(),
            issue_type: self.fields.issuetype.name,
            priority: self.fields.priority.name,
            status: self.fields.status.name,
            created: self.fields.created.into(),
            updated: self.fields.updated.into(),
            closed: self.fields.resolution_date.map(Into::into),
            time_spent_seconds: self.fields.timetracking.time_spent_seconds,
            history,
        }
    }
}
