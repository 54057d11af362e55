//! Service configuration, read from `DEVMON_*` environment variables.

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use storage::StorageConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// sqlx SQLite connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Concurrent database transactions
    #[serde(default = "default_db_workers")]
    pub db_workers: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    StorageConfig::default().database_url
}

fn default_max_connections() -> u32 {
    StorageConfig::default().max_connections
}

fn default_db_workers() -> usize {
    StorageConfig::default().db_workers
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("DEVMON").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Storage settings derived from this config
    pub fn storage(&self) -> StorageConfig {
        StorageConfig {
            database_url: self.database_url.clone(),
            max_connections: self.max_connections,
            db_workers: self.db_workers,
        }
    }
}
