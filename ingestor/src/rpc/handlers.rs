//! HTTP handlers for the two RPC operations.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use tokio_util::sync::CancellationToken;

use super::models::{GetProjectsResponse, ListProjectsQuery, PageInfo, ProjectPayload, UpdateProjectResponse};
use crate::error::IngestError;
use crate::service::IngestService;

#[derive(Clone)]
pub struct RpcState {
    pub service: Arc<IngestService>,
}

#[tracing::instrument(skip(state))]
pub async fn update_project(State(state): State<RpcState>, Path(project_key): Path<String>) -> Result<impl IntoResponse, IngestError> {
    let info = state.service.update_project(&project_key, CancellationToken::new()).await?;
    Ok(Json(UpdateProjectResponse { project: info.into(), success: true }))
}

#[tracing::instrument(skip(state))]
pub async fn get_projects(
    State(state): State<RpcState>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<impl IntoResponse, IngestError> {
    let (items, page_count, projects_count) = state.service.list_projects(query.limit, query.page, &query.search).await?;
    let projects: Vec<ProjectPayload> = items.into_iter().map(Into::into).collect();
    Ok(Json(GetProjectsResponse { projects, page_info: PageInfo { page_count, projects_count } }))
}
