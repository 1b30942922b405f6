//! Process configuration read from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DATABASE_URL` | unset | Postgres URL; unset runs on the in-memory store |
//! | `SERVER_PORT` | `8080` | HTTP listen port |
//! | `DB_MAX_CONNECTIONS` | `10` | Pool size |
//! | `DB_ACQUIRE_TIMEOUT_SECS` | `5` | Wait for a pooled connection |
//! | `LOG_FORMAT` | `json` | `json` or `pretty` |

use core::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use warung_observability::LogFormat;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub server_port: u16,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_port = parse_or(&get, "SERVER_PORT", 8080u16)?;
        let max_connections = parse_or(&get, "DB_MAX_CONNECTIONS", 10u32)?;
        let acquire_timeout_secs = parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 5u64)?;
        let log_format = parse_or(&get, "LOG_FORMAT", LogFormat::default())?;

        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        let database = get("DATABASE_URL").map(|url| DatabaseConfig {
            url,
            max_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
        });

        Ok(Self {
            database,
            server_port,
            log_format,
        })
    }
}

fn parse_or<G, T>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
