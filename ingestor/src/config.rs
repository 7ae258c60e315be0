//! Application configuration.
//!
//! Figment layering (a YAML file merged with `Env::prefixed`) behind a
//! top-level `mode` switch: `debug` loads a file plus environment
//! overrides, `production` is environment-variable-only. An unrecognized
//! mode is a fatal startup error (`ConfigError::UnknownMode`).

use std::time::Duration;

use clap::Parser;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file, used only in `debug` mode.
    #[arg(short = 'f', long, env = "INGESTOR_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Deployment mode: `debug` (file + env) or `production` (env only).
    #[arg(long, env = "INGESTOR_MODE", default_value = "debug")]
    pub mode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Debug,
    Production,
}

impl Mode {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_lowercase().as_str() {
            "debug" | "" => Ok(Mode::Debug),
            "production" => Ok(Mode::Production),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_version: String,
    pub max_connections: usize,
    pub max_processes: usize,
    pub max_results: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: "http://localhost:8080".to_string(),
            api_version: "/rest/api/2".to_string(),
            max_connections: 10,
            max_processes: 4,
            max_results: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateGateConfig {
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for RateGateConfig {
    fn default() -> Self {
        RateGateConfig { base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(60) }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig { url: "postgres://localhost:5432/ingestor".to_string(), max_connections: 10 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port_http: u16,
    pub upstream: UpstreamConfig,
    pub rate_gate: RateGateConfig,
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port_http: 8081,
            upstream: UpstreamConfig::default(),
            rate_gate: RateGateConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mode = Mode::parse(&args.mode)?;
        let figment = match mode {
            Mode::Debug => Figment::from(Self::default_provider()).merge(Yaml::file(&args.config)).merge(Env::prefixed("INGESTOR_").split("__")),
            Mode::Production => Figment::from(Self::default_provider()).merge(Env::prefixed("INGESTOR_").split("__")),
        };
        Ok(figment.extract()?)
    }

    fn default_provider() -> figment::providers::Serialized<Config> {
        figment::providers::Serialized::defaults(Config::default())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port_http)
    }
}
