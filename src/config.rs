use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_HTTP_ADDR: &str = "PKI_SCHEDULER_HTTP_ADDR";
pub const ENV_DATABASE: &str = "PKI_SCHEDULER_DB";
pub const ENV_UPLOAD_LIMIT: &str = "PKI_SCHEDULER_UPLOAD_LIMIT";

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_DATABASE: &str = "database.db";
const DEFAULT_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid socket address '{value}': {source}")]
    InvalidAddr {
        var: &'static str,
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("{var}: invalid byte count '{value}': {source}")]
    InvalidLimit {
        var: &'static str,
        value: String,
        source: std::num::ParseIntError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub database_path: PathBuf,
    /// Largest accepted roster upload, in bytes.
    pub upload_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Unset or blank
    /// variables fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr = value(ENV_HTTP_ADDR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = addr
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidAddr {
                var: ENV_HTTP_ADDR,
                value: addr.clone(),
                source,
            })?;

        let database_path = value(ENV_DATABASE)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));

        let upload_limit = match value(ENV_UPLOAD_LIMIT) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidLimit {
                    var: ENV_UPLOAD_LIMIT,
                    value: raw.clone(),
                    source,
                })?,
            None => DEFAULT_UPLOAD_LIMIT,
        };

        Ok(Self {
            http_addr,
            database_path,
            upload_limit,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 5000))),
            database_path: PathBuf::from(DEFAULT_DATABASE),
            upload_limit: DEFAULT_UPLOAD_LIMIT,
        }
    }
}
