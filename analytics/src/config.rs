//! Configuration for the analytics service.
//!
//! A smaller cousin of `ingestor::config`: same figment layering and mode
//! switch, but only the fields this service actually reads — a database
//! connection and an HTTP bind address.

use clap::Parser;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(short = 'f', long, env = "ANALYTICS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    #[arg(long, env = "ANALYTICS_MODE", default_value = "debug")]
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
pub struct CacheConfig {
    #[serde(with = "humantime_serde")]
    pub ttl: std::time::Duration,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { ttl: std::time::Duration::from_secs(60), max_capacity: 1000 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port_http: u16,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config { host: "0.0.0.0".to_string(), port_http: 8082, database: DatabaseConfig::default(), cache: CacheConfig::default() }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mode = Mode::parse(&args.mode)?;
        let figment = match mode {
            Mode::Debug => {
                Figment::from(Self::default_provider()).merge(Yaml::file(&args.config)).merge(Env::prefixed("ANALYTICS_").split("__"))
            }
            Mode::Production => Figment::from(Self::default_provider()).merge(Env::prefixed("ANALYTICS_").split("__")),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mode_is_rejected() {
        let args = Args { config: "config.yaml".to_string(), mode: "staging".to_string() };
        assert!(matches!(Config::load(&args), Err(ConfigError::UnknownMode(_))));
    }
}
