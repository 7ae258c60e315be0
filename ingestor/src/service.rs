//! The ingest service: end-to-end coordination of one project ingest,
//! full-fetch vs incremental.
//!
//! Looks up existing project state, decides full vs incremental, crawls,
//! saves. `lastUpdate` is always refreshed on an incremental pass, even one
//! that turns up zero new issues — the crawl still observed the upstream as
//! of `updateStartedAt`, even if nothing changed.

use std::sync::Arc;

use chrono::Utc;
use domain::{Issue, Page, Project, ProjectInfo};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::crawl::Crawl;
use crate::error::IngestError;
use crate::rate_gate::SharedRateGate;
use crate::storage::Persistence;
use crate::upstream::UpstreamClient;

pub struct IngestService {
    upstream: Arc<dyn UpstreamClient>,
    persistence: Arc<dyn Persistence>,
    rate_gate: SharedRateGate,
    worker_count: usize,
    page_size: u32,
}

impl IngestService {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        persistence: Arc<dyn Persistence>,
        rate_gate: SharedRateGate,
        worker_count: usize,
        page_size: u32,
    ) -> Self {
        IngestService { upstream, persistence, rate_gate, worker_count, page_size }
    }

    /// Full or incremental update of one project.
    #[instrument(skip(self), fields(project_key))]
    pub async fn update_project(&self, project_key: &str, cancel: CancellationToken) -> Result<ProjectInfo, IngestError> {
        let update_started_at = Utc::now();
        let previous_last_update = self.persistence.lookup_last_update(project_key).await?;

        let crawl = Crawl {
            upstream: self.upstream.clone(),
            rate_gate: self.rate_gate.clone(),
            worker_count: self.worker_count,
            page_size: self.page_size,
        };

        let (meta_name, meta_url, issues): (String, String, Vec<Issue>) = match previous_last_update {
            None => {
                let meta = self.upstream.fetch_project_meta(project_key).await?;
                let total = self.upstream.fetch_issues_count(project_key, None).await?;
                info!(project_key, total, "full fetch");
                let issues = crawl.run(project_key, None, total, cancel).await?;
                (meta.name, meta.url, issues)
            }
            Some(since) => {
                let total = self.upstream.fetch_issues_count(project_key, Some(since)).await?;
                info!(project_key, total, "incremental fetch");
                let issues = if total > 0 { crawl.run(project_key, Some(since), total, cancel).await? } else { Vec::new() };
                // lastUpdate is always refreshed, even on a zero-new-issues
                // incremental pass (Open Question resolution, DESIGN.md).
                let existing = self.persistence.get_project(project_key).await?;
                let (name, url) = existing.map(|p| (p.name, p.url)).unwrap_or_else(|| (project_key.to_string(), String::new()));
                (name, url, issues)
            }
        };

        let total_issue_count = issues.len() as i64;
        let project = Project {
            id: None,
            key: project_key.to_string(),
            name: meta_name,
            url: meta_url,
            last_update: update_started_at,
            total_issue_count,
            issues,
        };

        let project_id = self.persistence.save_project(&project).await?;

        Ok(ProjectInfo { id: project_id, key: project.key, name: project.name, url: project.url, last_update: project.last_update })
    }

    /// `listProjects(limit, page, search)`, a pure pass-through filter.
    pub async fn list_projects(&self, limit: u32, page: u32, search: &str) -> Result<(Vec<ProjectInfo>, u64, u64), IngestError> {
        let page = Page::new(limit, page)?;
        let (items, total_matches) = self.persistence.list_projects(page.limit, page.offset(), search).await?;
        let page_count = page.page_count(total_matches);
        Ok((items, page_count, total_matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::upstream::UpstreamProjectMeta;
    use async_trait::async_trait;
    use domain::UpstreamProjectListing;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct FakeUpstream {
        total_full: u64,
        total_incremental: u64,
        call_count: AtomicU32,
        project_meta_not_found: bool,
    }

    #[async_trait]
    impl UpstreamClient for FakeUpstream {
        async fn fetch_project_meta(&self, project_key: &str) -> Result<UpstreamProjectMeta, UpstreamError> {
            if self.project_meta_not_found {
                return Err(UpstreamError::from_status(404, "no such project".into()));
            }
            Ok(UpstreamProjectMeta {
                key: project_key.to_string(),
                name: "Demo Project".to_string(),
                url: format!("https://example.invalid/projects/{project_key}"),
            })
        }

        async fn fetch_issues_count(&self, _project_key: &str, since: Option<chrono::DateTime<Utc>>) -> Result<u64, UpstreamError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(if since.is_some() { self.total_incremental } else { self.total_full })
        }

        async fn fetch_issues_page(
            &self,
            project_key: &str,
            _since: Option<chrono::DateTime<Utc>>,
            start_at: u64,
            _page_size: u32,
        ) -> Result<Vec<Issue>, UpstreamError> {
            Ok(vec![Issue {
                id: None,
                key: format!("{project_key}-{start_at}"),
                project_key: project_key.to_string(),
                creator_display_name: "alice".to_string(),
                assignee_display_name: None,
                summary: String::new(),
                description: String::new(),
                issue_type: "Task".to_string(),
                priority: "Low".to_string(),
                status: "Open".to_string(),
                created: Utc::now(),
                updated: Utc::now(),
                closed: None,
                time_spent_seconds: None,
                history: Vec::new(),
            }])
        }

        async fn fetch_project_list(&self) -> Result<Vec<UpstreamProjectListing>, UpstreamError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakePersistence {
        saved: Mutex<Option<Project>>,
        existing_last_update: Option<chrono::DateTime<Utc>>,
    }

    #[async_trait]
    impl Persistence for FakePersistence {
        async fn lookup_last_update(&self, _project_key: &str) -> Result<Option<chrono::DateTime<Utc>>, crate::error::StorageError> {
            Ok(self.existing_last_update)
        }

        async fn save_project(&self, project: &Project) -> Result<domain::ProjectId, crate::error::StorageError> {
            *self.saved.lock().await = Some(project.clone());
            Ok(domain::ProjectId(1))
        }

        async fn get_project(&self, project_key: &str) -> Result<Option<ProjectInfo>, crate::error::StorageError> {
            Ok(Some(ProjectInfo {
                id: domain::ProjectId(1),
                key: project_key.to_string(),
                name: "Demo Project".into(),
                url: String::new(),
                last_update: Utc::now(),
            }))
        }

        async fn list_projects(
            &self,
            _limit: u32,
            _offset: u32,
            _search: &str,
        ) -> Result<(Vec<ProjectInfo>, u64), crate::error::StorageError> {
            Ok((vec![ProjectInfo { id: domain::ProjectId(1), key: "PRJ".into(), name: "Demo Project".into(), url: String::new(), last_update: Utc::now() }], 1))
        }
    }

    fn service(upstream: FakeUpstream, persistence: FakePersistence) -> IngestService {
        let rate_gate = Arc::new(crate::rate_gate::RateGate::new(Duration::from_millis(5), Duration::from_secs(5)));
        IngestService::new(Arc::new(upstream), Arc::new(persistence), rate_gate, 2, 10)
    }

    #[tokio::test]
    async fn first_ingest_does_a_full_fetch() {
        let svc = service(
            FakeUpstream { total_full: 3, ..Default::default() },
            FakePersistence { existing_last_update: None, ..Default::default() },
        );

        let info = tokio::time::timeout(Duration::from_secs(2), svc.update_project("PRJ", CancellationToken::new()))
            .await
            .expect("ingest should not hang")
            .unwrap();
        assert_eq!(info.key, "PRJ");
    }

    #[tokio::test]
    async fn incremental_ingest_with_zero_new_issues_still_refreshes_last_update() {
        let svc = service(
            FakeUpstream::default(),
            FakePersistence { existing_last_update: Some(Utc::now() - chrono::Duration::days(1)), ..Default::default() },
        );

        let before = Utc::now();
        let info = tokio::time::timeout(Duration::from_secs(2), svc.update_project("PRJ", CancellationToken::new()))
            .await
            .expect("ingest should not hang")
            .unwrap();
        assert!(info.last_update >= before);
    }

    /// A fatal upstream error (404 on project metadata) must surface at
    /// `update_project` without ever reaching `Persistence.save_project`.
    #[tokio::test]
    async fn fatal_upstream_error_aborts_before_any_save() {
        let upstream = FakeUpstream { project_meta_not_found: true, ..Default::default() };
        let persistence = Arc::new(FakePersistence::default());
        let rate_gate = Arc::new(crate::rate_gate::RateGate::new(Duration::from_millis(5), Duration::from_secs(5)));
        let svc = IngestService::new(Arc::new(upstream), persistence.clone(), rate_gate, 2, 10);

        let result = svc.update_project("NONEXISTENT", CancellationToken::new()).await;
        assert!(matches!(result, Err(IngestError::Upstream(_))));
        assert!(persistence.saved.lock().await.is_none());
    }

    #[tokio::test]
    async fn zero_limit_list_projects_is_rejected() {
        let svc = service(
            FakeUpstream::default(),
            FakePersistence::default(),
        );

        let result = svc.list_projects(0, 1, "").await;
        assert!(matches!(result, Err(IngestError::ZeroLimit)));
    }
}
