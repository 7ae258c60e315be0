//! Postgres implementation of [`Persistence`].
//!
//! One transaction per save: project upsert, then an author dedup
//! pre-pass, then an issue batch upsert, then a status-change insert.
//! Queries use the runtime-checked `sqlx::query`/`query_as` API rather than
//! the `query!` macro family, since that family needs either a live
//! database or a checked-in query cache at build time to type-check.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use domain::{Project, ProjectId, ProjectInfo};
use sqlx::{PgPool, Row};

use super::Persistence;
use crate::error::StorageError;

pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../domain/migrations");

#[async_trait::async_trait]
impl Persistence for PostgresPersistence {
    async fn lookup_last_update(&self, project_key: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        let row = sqlx::query("SELECT last_update FROM projects WHERE key = $1")
            .bind(project_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<DateTime<Utc>, _>("last_update")))
    }

    async fn save_project(&self, project: &Project) -> Result<ProjectId, StorageError> {
        let mut tx = self.pool.begin().await?;

        // Step 2: project upsert.
        let project_row = sqlx::query(
            "INSERT INTO projects (key, title, url, last_update, total_issue_count)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (key) DO UPDATE SET
                title = EXCLUDED.title,
                url = EXCLUDED.url,
                last_update = EXCLUDED.last_update,
                total_issue_count = EXCLUDED.total_issue_count
             RETURNING id",
        )
        .bind(&project.key)
        .bind(&project.name)
        .bind(&project.url)
        .bind(project.last_update)
        .bind(project.total_issue_count)
        .fetch_one(&mut *tx)
        .await?;
        let project_id: i64 = project_row.get("id");

        // Step 3: author dedup pre-pass.
        let mut author_names: Vec<String> = project
            .issues
            .iter()
            .flat_map(|issue| issue.referenced_author_names())
            .map(str::to_string)
            .collect();
        author_names.sort();
        author_names.dedup();

        if !author_names.is_empty() {
            sqlx::query("INSERT INTO authors (name) SELECT * FROM UNNEST($1::text[]) ON CONFLICT (name) DO NOTHING")
                .bind(&author_names)
                .execute(&mut *tx)
                .await?;
        }

        let author_rows = sqlx::query("SELECT id, name FROM authors WHERE name = ANY($1)")
            .bind(&author_names)
            .fetch_all(&mut *tx)
            .await?;
        let author_ids: HashMap<String, i64> =
            author_rows.into_iter().map(|row| (row.get::<String, _>("name"), row.get::<i64, _>("id"))).collect();

        // Step 4: issue batch upsert.
        let mut issue_ids: HashMap<String, i64> = HashMap::new();
        for issue in &project.issues {
            let author_id = *author_ids
                .get(&issue.creator_display_name)
                .ok_or_else(|| StorageError::Database(sqlx::Error::RowNotFound))?;
            let assignee_id = issue.assignee_display_name.as_ref().and_then(|name| author_ids.get(name)).copied();

            let row = sqlx::query(
                "INSERT INTO issues
                    (project_id, author_id, assignee_id, key, summary, description, type, priority, status,
                     created_time, closed_time, updated_time, time_spent)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                 ON CONFLICT (key) DO UPDATE SET
                    summary = EXCLUDED.summary,
                    description = EXCLUDED.description,
                    type = EXCLUDED.type,
                    priority = EXCLUDED.priority,
                    status = EXCLUDED.status,
                    updated_time = EXCLUDED.updated_time,
                    closed_time = EXCLUDED.closed_time,
                    time_spent = EXCLUDED.time_spent,
                    assignee_id = EXCLUDED.assignee_id
                 RETURNING id, key",
            )
            .bind(project_id)
            .bind(author_id)
            .bind(assignee_id)
            .bind(&issue.key)
            .bind(&issue.summary)
            .bind(&issue.description)
            .bind(&issue.issue_type)
            .bind(&issue.priority)
            .bind(&issue.status)
            .bind(issue.created)
            .bind(issue.closed)
            .bind(issue.updated)
            .bind(issue.time_spent_seconds)
            .fetch_one(&mut *tx)
            .await?;

            issue_ids.insert(row.get::<String, _>("key"), row.get::<i64, _>("id"));
        }

        // Step 5: status-change batch insert.
        for issue in &project.issues {
            let Some(&issue_id) = issue_ids.get(&issue.key) else { continue };
            for history in &issue.history {
                for change in history.status_changes(&issue.key) {
                    let Some(&author_id) = author_ids.get(&change.author_display_name) else { continue };
                    sqlx::query(
                        "INSERT INTO status_changes (issue_id, author_id, change_time, from_status, to_status)
                         VALUES ($1, $2, $3, $4, $5)
                         ON CONFLICT (issue_id, change_time, from_status, to_status) DO NOTHING",
                    )
                    .bind(issue_id)
                    .bind(author_id)
                    .bind(change.changed_at)
                    .bind(&change.from_status)
                    .bind(&change.to_status)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(ProjectId(project_id))
    }

    async fn get_project(&self, project_key: &str) -> Result<Option<ProjectInfo>, StorageError> {
        let row = sqlx::query("SELECT id, key, title, url, last_update FROM projects WHERE key = $1")
            .bind(project_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| ProjectInfo {
            id: ProjectId(row.get("id")),
            key: row.get("key"),
            name: row.get("title"),
            url: row.get("url"),
            last_update: row.get("last_update"),
        }))
    }

    async fn list_projects(&self, limit: u32, offset: u32, search: &str) -> Result<(Vec<ProjectInfo>, u64), StorageError> {
        let pattern = format!("%{}%", search);

        let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM projects WHERE title ILIKE $1")
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?
            .get("count");

        let rows = sqlx::query("SELECT id, key, title, url, last_update FROM projects WHERE title ILIKE $1 ORDER BY key LIMIT $2 OFFSET $3")
            .bind(&pattern)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        let projects = rows
            .into_iter()
            .map(|row| ProjectInfo {
                id: ProjectId(row.get("id")),
                key: row.get("key"),
                name: row.get("title"),
                url: row.get("url"),
                last_update: row.get("last_update"),
            })
            .collect();

        Ok((projects, total as u64))
    }
}
