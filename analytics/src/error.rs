//! Error taxonomy for the analytics service: `NotFound` maps to 404 at this
//! service's surface; everything else is `StorageError`.

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
pub enum AnalyticsError {
    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("project not found: {0}")]
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for AnalyticsError {
    fn into_response(self) -> Response {
        let status = match &self {
            AnalyticsError::NotFound(_) => StatusCode::NOT_FOUND,
            AnalyticsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody { error: format!("{status}"), message: self.to_string() };
        (status, Json(body)).into_response()
    }
}
