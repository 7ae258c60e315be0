//! The ingestor's error taxonomy.
//!
//! Every failure in the crawl and persistence paths is returned to the RPC
//! boundary rather than logged-and-swallowed; logging is additive, not
//! terminal.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Classification of an upstream HTTP response, used by the crawl
/// coordinator to decide between pausing-and-retrying and aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// HTTP 429 or 5xx — retry after a `RateGate` pause.
    Transient,
    /// Any other 4xx, a JSON decode failure, or a network error — abort the crawl.
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream returned status {status}")]
    Api { status: u16, body: String, class: ErrorClass },

    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("network error talking to upstream: {0}")]
    Network(#[from] reqwest::Error),
}

impl UpstreamError {
    pub fn class(&self) -> ErrorClass {
        match self {
            UpstreamError::Api { class, .. } => *class,
            UpstreamError::Decode(_) => ErrorClass::Fatal,
            UpstreamError::Network(_) => ErrorClass::Fatal,
        }
    }

    pub fn from_status(status: u16, body: String) -> Self {
        let class = if status == 429 || status >= 500 { ErrorClass::Transient } else { ErrorClass::Fatal };
        UpstreamError::Api { status, body, class }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("page fetch exceeded the maximum rate-limit delay")]
    ExceededMaxDelay,

    #[error("crawl was cancelled")]
    Cancelled,

    #[error("fatal upstream error: {0}")]
    Fatal(#[from] UpstreamError),

    #[error("pageSize must be greater than zero")]
    InvalidPageSize,

    #[error("a crawl worker task panicked: {0}")]
    WorkerPanicked(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown deployment mode: {0}")]
    UnknownMode(String),

    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

/// Top-level error returned from the ingest service and surfaced at the RPC
/// boundary.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("project not found: {0}")]
    NotFound(String),

    #[error("limit must be greater than zero")]
    ZeroLimit,
}

impl From<domain::DomainError> for IngestError {
    fn from(value: domain::DomainError) -> Self {
        match value {
            domain::DomainError::ZeroLimit => IngestError::ZeroLimit,
            other => IngestError::NotFound(other.to_string()),
        }
    }
}

impl IngestError {
    /// Whether a caller should consider retrying: `Transient` failures that
    /// still exhausted the rate gate's budget report `false` here since the
    /// crawl already gave up.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            IngestError::Upstream(e) if e.class() == ErrorClass::Transient
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            IngestError::NotFound(_) => StatusCode::NOT_FOUND,
            IngestError::ZeroLimit => StatusCode::BAD_REQUEST,
            IngestError::Crawl(CrawlError::InvalidPageSize) => StatusCode::BAD_REQUEST,
            IngestError::Crawl(CrawlError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            IngestError::Crawl(CrawlError::ExceededMaxDelay) => StatusCode::BAD_GATEWAY,
            IngestError::Crawl(CrawlError::Fatal(_)) | IngestError::Upstream(_) => StatusCode::BAD_GATEWAY,
            IngestError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    retryable: bool,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: format!("{status}"),
            message: self.to_string(),
            retryable: self.retryable(),
        };
        (status, Json(body)).into_response()
    }
}
