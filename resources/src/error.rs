//! Error taxonomy for the resources service: `NotFound` maps to 404;
//! `limit == 0` is a 400, the same rule the ingestor's `listProjects`
//! applies, carried over to this service's own pagination.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown deployment mode: {0}")]
    UnknownMode(String),

    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ResourcesError {
    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("limit must be greater than zero")]
    ZeroLimit,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ResourcesError {
    fn into_response(self) -> Response {
        let status = match &self {
            ResourcesError::NotFound(_) => StatusCode::NOT_FOUND,
            ResourcesError::ZeroLimit => StatusCode::BAD_REQUEST,
            ResourcesError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody { error: format!("{status}"), message: self.to_string() };
        (status, Json(body)).into_response()
    }
}
