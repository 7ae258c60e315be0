//! Request/response DTOs for the RPC surface.

use domain::ProjectInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub search: String,
}

fn default_limit() -> u32 {
    20
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct ProjectPayload {
    pub id: i64,
    pub url: String,
    pub key: String,
    pub name: String,
}

impl From<ProjectInfo> for ProjectPayload {
    fn from(info: ProjectInfo) -> Self {
        ProjectPayload { id: info.id.0, url: info.url, key: info.key, name: info.name }
    }
}

/// `UpdateProject(projectKey) → {project, success}`.
#[derive(Debug, Serialize)]
pub struct UpdateProjectResponse {
    pub project: ProjectPayload,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub page_count: u64,
    pub projects_count: u64,
}

/// `GetProjects(limit, page, search) → {projects, pageInfo}`.
#[derive(Debug, Serialize)]
pub struct GetProjectsResponse {
    pub projects: Vec<ProjectPayload>,
    pub page_info: PageInfo,
}
