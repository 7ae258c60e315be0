//! The RPC surface: a thin `axum` adapter over the ingest service, one route
//! per operation, wrapped in a logging middleware that records method,
//! duration, and error per call.

pub mod handlers;
pub mod models;

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::info;

pub use handlers::RpcState;

pub fn build_router(state: RpcState) -> Router {
    Router::new()
        .route("/projects/{key}", post(handlers::update_project))
        .route("/projects", get(handlers::get_projects))
        .layer(middleware::from_fn(log_requests))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO)))
        .with_state(state)
}

/// Logs method, path, duration, and (on failure) status for every call.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;

    let elapsed = started_at.elapsed();
    let status = response.status();
    if status.is_success() {
        info!(%method, path, ?elapsed, %status, "rpc call completed");
    } else {
        tracing::warn!(%method, path, ?elapsed, %status, "rpc call failed");
    }

    response
}
