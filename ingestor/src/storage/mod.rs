//! The Persistence trait: a small `#[async_trait]` seam between the service
//! layer and whichever backend implements it, so the ingest service can be
//! exercised against an in-memory fake without a live Postgres instance.

pub mod postgres;

use async_trait::async_trait;
use domain::{Project, ProjectId, ProjectInfo};

use crate::error::StorageError;

#[async_trait]
pub trait Persistence: Send + Sync {
    /// The stored `lastUpdate` cursor for a project, if it has ever been
    /// ingested. `None` signals a first-ever ingest (full fetch).
    async fn lookup_last_update(&self, project_key: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>, StorageError>;

    /// Persist a fully-assembled `Project` (with its `Issues` populated) in
    /// one transaction. Returns the `ProjectId` assigned (or reused, on
    /// repeat ingest).
    async fn save_project(&self, project: &Project) -> Result<ProjectId, StorageError>;

    /// The stored `ProjectInfo` for an exact project key, if it has ever been
    /// ingested. Used by incremental ingests to recover the `name`/`url`
    /// already on file without re-fetching them from upstream.
    async fn get_project(&self, project_key: &str) -> Result<Option<ProjectInfo>, StorageError>;

    async fn list_projects(&self, limit: u32, offset: u32, search: &str) -> Result<(Vec<ProjectInfo>, u64), StorageError>;
}
