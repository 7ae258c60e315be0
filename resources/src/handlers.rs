//! The resources HTTP surface: a paginated issue list per project, and a
//! single-issue lookup with its status-change history.
//!
//! Pagination reuses `domain::Page`'s 1-indexed, `limit == 0`-rejects
//! semantics — the same contract the ingestor's `listProjects` exposes —
//! so a caller paging through projects and issues sees one consistent rule,
//! not two.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use domain::{IssueSummary, Page};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};

use crate::error::ResourcesError;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct ListIssuesQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_limit() -> u32 {
    20
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub page_count: u64,
    pub items_count: u64,
}

#[derive(Debug, Serialize)]
pub struct ListIssuesResponse {
    pub issues: Vec<IssueSummary>,
    pub page_info: PageInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusChangeEntry {
    pub author_display_name: String,
    pub changed_at: DateTime<Utc>,
    pub from_status: String,
    pub to_status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub summary: IssueSummary,
    pub history: Vec<StatusChangeEntry>,
}

fn row_to_issue_summary(row: &sqlx::postgres::PgRow) -> IssueSummary {
    IssueSummary {
        key: row.get("key"),
        summary: row.get("summary"),
        status: row.get("status"),
        priority: row.get("priority"),
        issue_type: row.get("type"),
        creator_display_name: row.get("creator_name"),
        assignee_display_name: row.get("assignee_name"),
        created: row.get("created_time"),
        updated: row.get("updated_time"),
        closed: row.get("closed_time"),
    }
}

#[tracing::instrument(skip(state))]
pub async fn list_issues(
    State(state): State<AppState>,
    Path(project_key): Path<String>,
    Query(query): Query<ListIssuesQuery>,
) -> Result<impl IntoResponse, ResourcesError> {
    let page = Page::new(query.limit, query.page).map_err(|_| ResourcesError::ZeroLimit)?;

    let project_exists = sqlx::query("SELECT 1 FROM projects WHERE key = $1").bind(&project_key).fetch_optional(&state.db).await?;
    if project_exists.is_none() {
        return Err(ResourcesError::NotFound(project_key));
    }

    let total: i64 = sqlx::query(
        "SELECT COUNT(*) AS count FROM issues i JOIN projects p ON p.id = i.project_id WHERE p.key = $1",
    )
    .bind(&project_key)
    .fetch_one(&state.db)
    .await?
    .get("count");

    let rows = sqlx::query(
        "SELECT i.key, i.summary, i.status, i.priority, i.type, i.created_time, i.updated_time, i.closed_time,
                creator.name AS creator_name, assignee.name AS assignee_name
         FROM issues i
         JOIN projects p ON p.id = i.project_id
         JOIN authors creator ON creator.id = i.author_id
         LEFT JOIN authors assignee ON assignee.id = i.assignee_id
         WHERE p.key = $1
         ORDER BY i.key
         LIMIT $2 OFFSET $3",
    )
    .bind(&project_key)
    .bind(page.limit as i64)
    .bind(page.offset() as i64)
    .fetch_all(&state.db)
    .await?;

    let issues: Vec<IssueSummary> = rows.iter().map(row_to_issue_summary).collect();
    let total = total as u64;

    Ok(Json(ListIssuesResponse { issues, page_info: PageInfo { page_count: page.page_count(total), items_count: total } }))
}

#[tracing::instrument(skip(state))]
pub async fn get_issue(State(state): State<AppState>, Path(issue_key): Path<String>) -> Result<impl IntoResponse, ResourcesError> {
    let row = sqlx::query(
        "SELECT i.key, i.summary, i.status, i.priority, i.type, i.created_time, i.updated_time, i.closed_time, i.id,
                creator.name AS creator_name, assignee.name AS assignee_name
         FROM issues i
         JOIN authors creator ON creator.id = i.author_id
         LEFT JOIN authors assignee ON assignee.id = i.assignee_id
         WHERE i.key = $1",
    )
    .bind(&issue_key)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ResourcesError::NotFound(issue_key.clone()))?;

    let issue_id: i64 = row.get("id");
    let summary = row_to_issue_summary(&row);

    let history_rows = sqlx::query(
        "SELECT sc.change_time, sc.from_status, sc.to_status, a.name AS author_name
         FROM status_changes sc
         JOIN authors a ON a.id = sc.author_id
         WHERE sc.issue_id = $1
         ORDER BY sc.change_time",
    )
    .bind(issue_id)
    .fetch_all(&state.db)
    .await?;

    let history = history_rows
        .into_iter()
        .map(|row| StatusChangeEntry {
            author_display_name: row.get("author_name"),
            changed_at: row.get("change_time"),
            from_status: row.get("from_status"),
            to_status: row.get("to_status"),
        })
        .collect();

    Ok(Json(IssueDetail { summary, history }))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_project(pool: &PgPool, key: &str) -> i64 {
        sqlx::query("INSERT INTO projects (key, title, url, last_update) VALUES ($1, $2, $3, now()) RETURNING id")
            .bind(key)
            .bind("Test Project")
            .bind("https://example.invalid")
            .fetch_one(pool)
            .await
            .unwrap()
            .get("id")
    }

    async fn seed_author(pool: &PgPool, name: &str) -> i64 {
        sqlx::query("INSERT INTO authors (name) VALUES ($1) RETURNING id").bind(name).fetch_one(pool).await.unwrap().get("id")
    }

    async fn seed_issue(pool: &PgPool, project_id: i64, author_id: i64, key: &str) -> i64 {
        sqlx::query(
            "INSERT INTO issues (project_id, author_id, key, summary, description, type, priority, status, created_time, updated_time)
             VALUES ($1, $2, $3, 's', 'd', 'Task', 'Medium', 'Open', now(), now())
             RETURNING id",
        )
        .bind(project_id)
        .bind(author_id)
        .bind(key)
        .fetch_one(pool)
        .await
        .unwrap()
        .get("id")
    }

    #[sqlx::test(migrations = "../domain/migrations")]
    async fn list_issues_rejects_zero_limit(pool: PgPool) {
        let state = AppState { db: pool };
        let err = list_issues(
            State(state),
            Path("DEMO".to_string()),
            Query(ListIssuesQuery { limit: 0, page: 1 }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResourcesError::ZeroLimit));
    }

    #[sqlx::test(migrations = "../domain/migrations")]
    async fn list_issues_is_not_found_for_unknown_project(pool: PgPool) {
        let state = AppState { db: pool };
        let err = list_issues(
            State(state),
            Path("MISSING".to_string()),
            Query(ListIssuesQuery { limit: 20, page: 1 }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResourcesError::NotFound(_)));
    }

    #[sqlx::test(migrations = "../domain/migrations")]
    async fn get_issue_returns_history_ordered_by_change_time(pool: PgPool) {
        let project_id = seed_project(&pool, "DEMO").await;
        let alice = seed_author(&pool, "Alice").await;
        let issue_id = seed_issue(&pool, project_id, alice, "DEMO-1").await;

        sqlx::query(
            "INSERT INTO status_changes (issue_id, author_id, change_time, from_status, to_status)
             VALUES ($1, $2, now() - interval '1 hour', 'Open', 'In Progress'),
                    ($1, $2, now(), 'In Progress', 'Done')",
        )
        .bind(issue_id)
        .bind(alice)
        .execute(&pool)
        .await
        .unwrap();

        let state = AppState { db: pool };
        let response = get_issue(State(state), Path("DEMO-1".to_string())).await.unwrap().into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let detail: IssueDetail = serde_json::from_slice(&body).unwrap();

        assert_eq!(detail.summary.key, "DEMO-1");
        assert_eq!(detail.history.len(), 2);
        assert_eq!(detail.history[0].to_status, "In Progress");
        assert_eq!(detail.history[1].to_status, "Done");
    }
}
