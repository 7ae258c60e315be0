use clap::Parser;
use tracing_subscriber::EnvFilter;

use resources::{config, Application};

fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).try_init().map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = config::Args::parse();
    let config = config::Config::load(&args)?;

    init_telemetry()?;
    tracing::debug!(?config, "loaded configuration");

    let app = Application::new(config).await?;
    app.serve(async {
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    })
    .await
}
