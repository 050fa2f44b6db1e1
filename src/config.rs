//! Configuration loading.
//!
//! Settings come from an optional YAML file with CLI flags layered on top.
//! With no file present the defaults place the database under the platform
//! data directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default port for the HTTP API.
pub const DEFAULT_HTTP_PORT: u16 = 31780;

/// Config file name looked up in the working directory.
const CONFIG_FILE_NAME: &str = "task-deps.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

/// Server paths and HTTP bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP API binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// Port the HTTP API listens on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            http_host: default_http_host(),
            http_port: default_http_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("task-deps")
        .join("task-deps.db")
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

impl Config {
    /// Load configuration: an explicit file if given, otherwise
    /// `task-deps.yaml` in the working directory, otherwise defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local = Path::new(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::from_file(local);
        }

        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Create the database's parent directory if missing.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create db directory {}", parent.display()))?;
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.server.http_host, self.server.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_on_empty_yaml() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.server.http_host, "127.0.0.1");
    }

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let config: Config = serde_yaml::from_str("server:\n  http_port: 9000\n").unwrap();
        assert_eq!(config.server.http_port, 9000);
        assert_eq!(config.server.http_host, "127.0.0.1");
    }
}
