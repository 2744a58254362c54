//! Process configuration loaded from the environment.
//!
//! Values come from real environment variables, optionally seeded from a
//! `.env` file. Unset variables fall back to development defaults.

use std::net::SocketAddr;

use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("{0} must be set when {1}")]
    Missing(&'static str, &'static str),
}

/// Log output format requested by `STORELEDGER_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Which stock ledger backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// True when `jwt_secret` is the built-in development secret.
    pub jwt_secret_is_default: bool,
    pub storage: StorageBackend,
    /// Present iff `storage` is `Postgres`.
    pub database: Option<DatabaseConfig>,
    pub log_format: LogFormat,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_level: String,
    /// Capacity of the live movement stream buffer.
    pub event_buffer: usize,
}

impl AppConfig {
    /// Load from the process environment (after reading `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = match get("STORELEDGER_BIND_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "STORELEDGER_BIND_ADDR",
                message: format!("{e}"),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let (jwt_secret, jwt_secret_is_default) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        let storage = match get("STORELEDGER_STORAGE").as_deref().map(str::trim) {
            None => StorageBackend::Memory,
            Some(v) if v.eq_ignore_ascii_case("memory") => StorageBackend::Memory,
            Some(v) if v.eq_ignore_ascii_case("postgres") => StorageBackend::Postgres,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORELEDGER_STORAGE",
                    message: format!("expected 'memory' or 'postgres', got '{other}'"),
                });
            }
        };

        let database = match storage {
            StorageBackend::Memory => None,
            StorageBackend::Postgres => {
                let url = get("DATABASE_URL")
                    .ok_or(ConfigError::Missing("DATABASE_URL", "STORELEDGER_STORAGE=postgres"))?;
                let max_connections = parse_number(&get, "STORELEDGER_DB_MAX_CONNECTIONS", 5)?;
                Some(DatabaseConfig {
                    url,
                    max_connections,
                })
            }
        };

        let log_format = match get("STORELEDGER_LOG_FORMAT").as_deref().map(str::trim) {
            None => LogFormat::Json,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORELEDGER_LOG_FORMAT",
                    message: format!("expected 'json' or 'pretty', got '{other}'"),
                });
            }
        };

        let log_level = get("STORELEDGER_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let event_buffer: usize = parse_number(&get, "STORELEDGER_EVENT_BUFFER", 256)?;
        if event_buffer == 0 {
            return Err(ConfigError::Invalid {
                key: "STORELEDGER_EVENT_BUFFER",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            jwt_secret,
            jwt_secret_is_default,
            storage,
            database,
            log_format,
            log_level,
            event_buffer,
        })
    }
}

fn parse_number<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
