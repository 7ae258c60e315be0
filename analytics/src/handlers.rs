//! The analytics HTTP surface: one cached aggregate endpoint,
//! status-distribution per project.
//!
//! A `moka::future::Cache` sits in front of a read-only SQL query, expiring
//! on a fixed TTL rather than being invalidated by any cross-service
//! signal — there is no notification channel between `ingestor` and this
//! service.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::error::AnalyticsError;

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusDuration {
    pub status: String,
    pub average_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusDistribution {
    pub project_key: String,
    pub distribution: Vec<StatusCount>,
    pub average_time_in_status: Vec<StatusDuration>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: Cache<String, Arc<StatusDistribution>>,
}

async fn compute_status_distribution(db: &PgPool, project_key: &str) -> Result<StatusDistribution, AnalyticsError> {
    let project_exists = sqlx::query("SELECT 1 FROM projects WHERE key = $1").bind(project_key).fetch_optional(db).await?;
    if project_exists.is_none() {
        return Err(AnalyticsError::NotFound(project_key.to_string()));
    }

    let rows = sqlx::query(
        "SELECT i.status AS status, COUNT(*) AS count
         FROM issues i JOIN projects p ON p.id = i.project_id
         WHERE p.key = $1
         GROUP BY i.status
         ORDER BY i.status",
    )
    .bind(project_key)
    .fetch_all(db)
    .await?;

    let distribution =
        rows.into_iter().map(|row| StatusCount { status: row.get("status"), count: row.get("count") }).collect();

    // Average time spent per status, derived from the status_changes history rather
    // than the current `issues.status` column: a segment runs from the change that
    // entered a status to the change that left it, or to now() if the issue is still
    // there. LEAD() over each issue's own history finds that boundary.
    let duration_rows = sqlx::query(
        "WITH ordered AS (
             SELECT sc.to_status,
                    sc.change_time,
                    LEAD(sc.change_time) OVER (PARTITION BY sc.issue_id ORDER BY sc.change_time) AS next_change_time
             FROM status_changes sc
             JOIN issues i ON i.id = sc.issue_id
             JOIN projects p ON p.id = i.project_id
             WHERE p.key = $1
         )
         SELECT to_status AS status,
                AVG(EXTRACT(EPOCH FROM (COALESCE(next_change_time, now()) - change_time))) AS avg_seconds
         FROM ordered
         GROUP BY to_status
         ORDER BY to_status",
    )
    .bind(project_key)
    .fetch_all(db)
    .await?;

    let average_time_in_status = duration_rows
        .into_iter()
        .map(|row| StatusDuration { status: row.get("status"), average_seconds: row.get::<f64, _>("avg_seconds") })
        .collect();

    Ok(StatusDistribution { project_key: project_key.to_string(), distribution, average_time_in_status, computed_at: Utc::now() })
}

#[tracing::instrument(skip(state))]
pub async fn status_distribution(
    State(state): State<AppState>,
    Path(project_key): Path<String>,
) -> Result<impl IntoResponse, AnalyticsError> {
    if let Some(cached) = state.cache.get(&project_key).await {
        return Ok(Json((*cached).clone()));
    }

    let computed = compute_status_distribution(&state.db, &project_key).await?;
    let computed = Arc::new(computed);
    state.cache.insert(project_key, computed.clone()).await;
    Ok(Json((*computed).clone()))
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

    #[sqlx::test(migrations = "../domain/migrations")]
    async fn status_distribution_is_not_found_for_unknown_project(pool: PgPool) {
        let err = compute_status_distribution(&pool, "MISSING").await.unwrap_err();
        assert!(matches!(err, AnalyticsError::NotFound(_)));
    }

    #[sqlx::test(migrations = "../domain/migrations")]
    async fn status_distribution_counts_and_averages_time_in_status(pool: PgPool) {
        let project_id = seed_project(&pool, "DEMO").await;
        let alice = seed_author(&pool, "Alice").await;

        let issue_id: i64 = sqlx::query(
            "INSERT INTO issues (project_id, author_id, key, summary, description, type, priority, status, created_time, updated_time)
             VALUES ($1, $2, 'DEMO-1', 's', 'd', 'Task', 'Medium', 'Done', now(), now())
             RETURNING id",
        )
        .bind(project_id)
        .bind(alice)
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("id");

        sqlx::query(
            "INSERT INTO status_changes (issue_id, author_id, change_time, from_status, to_status)
             VALUES ($1, $2, now() - interval '2 hours', 'Open', 'In Progress'),
                    ($1, $2, now() - interval '1 hour', 'In Progress', 'Done')",
        )
        .bind(issue_id)
        .bind(alice)
        .execute(&pool)
        .await
        .unwrap();

        let distribution = compute_status_distribution(&pool, "DEMO").await.unwrap();
        assert_eq!(distribution.project_key, "DEMO");
        assert_eq!(distribution.distribution.len(), 1);
        assert_eq!(distribution.distribution[0].status, "Done");
        assert_eq!(distribution.distribution[0].count, 1);

        let in_progress = distribution.average_time_in_status.iter().find(|d| d.status == "In Progress").unwrap();
        assert!((in_progress.average_seconds - 3600.0).abs() < 5.0);
    }
}
