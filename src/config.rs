//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Which physical store the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    File,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "file" => Ok(BackendKind::File),
            other => Err(format!("unknown cache backend '{other}'")),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Backing store
    pub backend: BackendKind,
    /// Directory for the file backend
    pub cache_dir: PathBuf,
    /// Purge task interval in seconds
    pub purge_interval: u64,
    /// Seconds an expired entry is kept before the purge task removes it
    pub stale_retention: u64,
    /// Appended to the namespace path segment to form the key prefix
    pub namespace_separator: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_BACKEND` - `memory` or `file` (default: memory)
    /// - `CACHE_DIR` - file backend directory (default: ./cache-data)
    /// - `PURGE_INTERVAL` - purge frequency in seconds (default: 60)
    /// - `STALE_RETENTION` - expired-entry retention in seconds (default: 3600)
    /// - `NAMESPACE_SEPARATOR` - namespace/key separator (default: `:`)
    ///
    /// Unparseable values are logged with `warn!` and fall back to the
    /// default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            backend: parse_var("CACHE_BACKEND").unwrap_or(defaults.backend),
            cache_dir: env::var_os("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            purge_interval: parse_var("PURGE_INTERVAL").unwrap_or(defaults.purge_interval),
            stale_retention: parse_var("STALE_RETENTION").unwrap_or(defaults.stale_retention),
            namespace_separator: env::var("NAMESPACE_SEPARATOR")
                .unwrap_or(defaults.namespace_separator),
        }
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval.max(1))
    }

    pub fn stale_retention(&self) -> Duration {
        Duration::from_secs(self.stale_retention)
    }
}

fn parse_var<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(name, env::var(name).ok().as_deref())
}

fn parse_value<T>(name: &str, raw: Option<&str>) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = raw?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(var = name, value = raw, error = %err, "ignoring invalid setting, using default");
            None
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            backend: BackendKind::Memory,
            cache_dir: PathBuf::from("./cache-data"),
            purge_interval: 60,
            stale_retention: 3600,
            namespace_separator: ":".to_string(),
        }
    }
}
