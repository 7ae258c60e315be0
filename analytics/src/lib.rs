//! # analytics: cached status-distribution aggregates
//!
//! Deliberately thin — a standalone read-only service sitting beside the
//! ingestor. This crate reads the same Postgres schema the `ingestor`
//! writes (via the shared `domain` migrations) and serves one cached
//! aggregate endpoint over it.

pub mod config;
pub mod error;
pub mod handlers;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use moka::future::Cache;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::Config;
use handlers::AppState;

pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await
            .context("failed to connect to database")?;

        let cache = Cache::builder()
            .max_capacity(config.cache.max_capacity)
            .time_to_live(config.cache.ttl)
            .build();

        let state = AppState { db: pool, cache };

        let router = Router::new()
            .route("/projects/{key}/status-distribution", get(handlers::status_distribution))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        Ok(Application { router, config })
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await.with_context(|| format!("failed to bind {bind_addr}"))?;
        info!(bind_addr, "analytics listening");

        axum::serve(listener, self.router.into_make_service()).with_graceful_shutdown(shutdown).await?;
        Ok(())
    }
}
