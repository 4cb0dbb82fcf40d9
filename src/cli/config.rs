//! Configuration file
//!
//! Every field is optional. Command-line flags override the file.
//!
//! ```json
//! { "db": "./data.db", "listen": "127.0.0.1:9999", "sync_policy": "always" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineOptions, SyncPolicy, MEMORY};
use crate::http_server::HttpServerConfig;
use crate::store::StoreConfig;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database file, or ":memory:" (default)
    #[serde(default = "default_db")]
    pub db: String,

    /// Listen address (default "127.0.0.1:9999")
    #[serde(default = "default_listen")]
    pub listen: String,

    /// "always" fsyncs every commit, "never" leaves it to the OS
    #[serde(default)]
    pub sync_policy: SyncPolicy,

    /// Shrink on open when stale records exceed this percentage of live
    /// ones; null disables
    #[serde(default = "default_auto_shrink_percentage")]
    pub auto_shrink_percentage: Option<u32>,

    /// Logs below this size are never shrunk on open (default 32 MiB)
    #[serde(default = "default_auto_shrink_min_size")]
    pub auto_shrink_min_size: u64,

    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_db() -> String {
    MEMORY.to_string()
}
fn default_listen() -> String {
    "127.0.0.1:9999".to_string()
}
fn default_auto_shrink_percentage() -> Option<u32> {
    Some(100)
}
fn default_auto_shrink_min_size() -> u64 {
    33554432
} // 32MiB
fn default_page_size() -> usize {
    20
}
fn default_max_page_size() -> usize {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db: default_db(),
            listen: default_listen(),
            sync_policy: SyncPolicy::default(),
            auto_shrink_percentage: default_auto_shrink_percentage(),
            auto_shrink_min_size: default_auto_shrink_min_size(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// File (or defaults) with command-line overrides applied, validated.
    pub fn resolve(
        path: Option<&Path>,
        db: Option<String>,
        listen: Option<String>,
    ) -> CliResult<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        if let Some(db) = db {
            config.db = db;
        }
        if let Some(listen) = listen {
            config.listen = listen;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.db.is_empty() {
            return Err(CliError::config_error("db must not be empty"));
        }

        if HttpServerConfig::parse_listen(&self.listen).is_none() {
            return Err(CliError::config_error(format!(
                "Invalid listen address: '{}'. Expected host:port.",
                self.listen
            )));
        }

        if self.max_page_size == 0 {
            return Err(CliError::config_error("max_page_size must be > 0"));
        }

        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(CliError::config_error(format!(
                "default_page_size must be between 1 and max_page_size ({})",
                self.max_page_size
            )));
        }

        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            connection: self.db.clone(),
            engine: EngineOptions {
                sync_policy: self.sync_policy,
                auto_shrink_percentage: self.auto_shrink_percentage,
                auto_shrink_min_size: self.auto_shrink_min_size,
            },
        }
    }

    pub fn http_config(&self) -> CliResult<HttpServerConfig> {
        let (host, port) = HttpServerConfig::parse_listen(&self.listen).ok_or_else(|| {
            CliError::config_error(format!("Invalid listen address: '{}'", self.listen))
        })?;
        Ok(HttpServerConfig {
            host,
            port,
            cors_origins: self.cors_origins.clone(),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        })
    }
}
