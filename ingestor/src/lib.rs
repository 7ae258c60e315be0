//! # ingestor: parallel paginated crawl and transactional persistence
//!
//! `ingestor` pulls projects and issues from a remote issue-tracker upstream,
//! persists them into Postgres under a single transaction per project, and
//! exposes a small synchronous RPC surface (`UpdateProject`, `GetProjects`)
//! over `axum` for the `analytics` and `resources` services — and any other
//! caller — to drive.
//!
//! ## Architecture
//!
//! The crawl path is three layers deep: [`rate_gate`] owns the single
//! adaptive backoff signal shared by every worker, [`crawl`] fans a page
//! range out across a bounded worker pool built on top of it, and
//! [`upstream`] is the stateless HTTP client each worker calls into.
//! [`service`] ties full-vs-incremental decision making and [`storage`]'s
//! transactional upsert together into the one operation the RPC surface
//! exposes: `update_project`.
//!
//! ## Quick start
//!
//! ```no_run
//! use clap::Parser;
//! use ingestor::{config, Application};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = config::Args::parse();
//!     let config = config::Config::load(&args)?;
//!     ingestor::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
//!     })
//!     .await
//! }
//! ```

pub mod config;
pub mod crawl;
pub mod error;
pub mod rate_gate;
pub mod rpc;
pub mod service;
pub mod storage;
pub mod telemetry;
pub mod upstream;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;

pub use config::Config;
use rate_gate::RateGate;
use rpc::RpcState;
use service::IngestService;
use storage::postgres::PostgresPersistence;
use upstream::HttpUpstreamClient;

/// The assembled service, ready to bind and serve. Owns the database pool
/// and router; `Application::new` is the one place the ingest service, its
/// `RateGate`, `HttpUpstreamClient`, and `PostgresPersistence` are wired
/// together — `Persistence` and `UpstreamClient` are the only exchangeable
/// seams, everything else here is concrete.
pub struct Application {
    router: axum::Router,
    config: Config,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await
            .context("failed to connect to database")?;

        let persistence = PostgresPersistence::new(pool);
        persistence.run_migrations().await.context("failed to run migrations")?;

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.upstream.max_connections)
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build upstream HTTP client")?;

        let upstream = HttpUpstreamClient::new(
            http,
            upstream::Config { base_url: config.upstream.base_url.clone(), api_version: config.upstream.api_version.clone() },
        );

        let rate_gate = Arc::new(RateGate::new(config.rate_gate.base_delay, config.rate_gate.max_delay));

        let service = Arc::new(IngestService::new(
            Arc::new(upstream),
            Arc::new(persistence),
            rate_gate,
            config.upstream.max_processes,
            config.upstream.max_results,
        ));

        let router = rpc::build_router(RpcState { service });

        Ok(Application { router, config })
    }

    /// Bind and serve until `shutdown` resolves, then return.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await.with_context(|| format!("failed to bind {bind_addr}"))?;
        info!(bind_addr, "ingestor listening");

        axum::serve(listener, self.router.into_make_service()).with_graceful_shutdown(shutdown).await?;
        Ok(())
    }
}
