use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;
use crate::issue::Issue;

/// The full aggregate assembled by a crawl and handed to Persistence in one
/// transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Option<ProjectId>,
    pub key: String,
    pub name: String,
    pub url: String,
    pub last_update: DateTime<Utc>,
    pub total_issue_count: i64,
    pub issues: Vec<Issue>,
}

/// The slim projection returned by `ListProjects`/`UpdateProject` at the RPC
/// boundary — no issue payload attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: ProjectId,
    pub key: String,
    pub name: String,
    pub url: String,
    pub last_update: DateTime<Utc>,
}

/// Upstream's bare project listing entry (`GET /project`), before it has
/// ever been ingested — no `lastUpdate` cursor yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamProjectListing {
    pub id: String,
    pub key: String,
    pub name: String,
}
