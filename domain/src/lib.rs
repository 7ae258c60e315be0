//! Shared value types and schema for the issue-tracker ingest/analytics/resources workspace.
//!
//! This crate has no knowledge of HTTP, Postgres drivers, or RPC transports —
//! it is the vocabulary the three services (`ingestor`, `analytics`,
//! `resources`) agree on. The relational schema itself lives in
//! `migrations/`, embedded via `sqlx::migrate!` by whichever binary owns
//! running migrations (the `ingestor`).

pub mod author;
pub mod changelog;
pub mod error;
pub mod ids;
pub mod issue;
pub mod project;
pub mod time;

pub use author::Author;
pub use changelog::{ChangelogHistory, ChangelogItem, PersistedStatusChange, StatusChange};
pub use error::DomainError;
pub use ids::{AuthorId, IssueId, ProjectId};
pub use issue::{Issue, IssueSummary};
pub use project::{Project, ProjectInfo, UpstreamProjectListing};
pub use time::FlexibleTimestamp;

/// Pagination parameters shared by `listProjects` (ingestor) and the
/// resources read API. 1-indexed pages; `limit == 0` is a caller error.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: u32,
    pub page: u32,
}

impl Page {
    pub fn new(limit: u32, page: u32) -> Result<Self, DomainError> {
        if limit == 0 {
            return Err(DomainError::ZeroLimit);
        }
        Ok(Page { limit, page: page.max(1) })
    }

    /// Zero-based offset of the first item on this page.
    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.limit
    }

    pub fn page_count(&self, total_matches: u64) -> u64 {
        total_matches.div_ceil(self.limit as u64)
    }
}
