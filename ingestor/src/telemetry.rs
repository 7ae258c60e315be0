//! Logging initialization.
//!
//! A `tracing-subscriber` registry with the `fmt` layer plus an
//! `EnvFilter`, deliberately without an OTLP export layer — this service
//! has no distributed-tracing backend to ship spans to.

use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber. `RUST_LOG` selects verbosity;
/// defaults to `info` when unset or unparseable.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).try_init().map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
