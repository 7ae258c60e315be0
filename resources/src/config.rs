//! Configuration for the resources service — the same figment layering and
//! mode switch as `ingestor::config`, pared down to the fields this
//! read-only service needs.

use clap::Parser;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(short = 'f', long, env = "RESOURCES_CONFIG", default_value = "config.yaml")]
    pub config: String,

    #[arg(long, env = "RESOURCES_MODE", default_value = "debug")]
    pub mode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
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
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig { url: "postgres://localhost:5432/ingestor".to_string(), max_connections: 5 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port_http: u16,
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config { host: "0.0.0.0".to_string(), port_http: 8083, database: DatabaseConfig::default() }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mode = Mode::parse(&args.mode)?;
        let figment = match mode {
            Mode::Debug => {
                Figment::from(Self::default_provider()).merge(Yaml::file(&args.config)).merge(Env::prefixed("RESOURCES_").split("__"))
            }
            Mode::Production => Figment::from(Self::default_provider()).merge(Env::prefixed("RESOURCES_").split("__")),
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
