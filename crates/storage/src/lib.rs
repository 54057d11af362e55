//! Storage Layer
//!
//! SQLite persistence for customers, devices, device logs and error reports.
//! Every repository call runs as one transaction on a bounded pool of
//! database worker tasks.

mod executor;
mod queries;
mod records;
mod repository;
mod schema;
mod sqlite;

pub use executor::{DbExecutor, TxFuture};
pub use records::{
    now_millis, Customer, Device, DeviceLog, ErrorReport, STATUS_ACTIVE, STATUS_INVALID,
};
pub use repository::DeviceRepository;
pub use sqlite::SqliteDeviceRepository;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Schema migration failed: {0}")]
    Migration(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Database worker failed: {0}")]
    Executor(String),
}

/// Connection settings for the SQLite store
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// sqlx connection URL, e.g. `sqlite://devmon.db?mode=rwc`
    pub database_url: String,
    /// Connection pool size
    pub max_connections: u32,
    /// Concurrent transactions allowed on the worker pool
    pub db_workers: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://devmon.db?mode=rwc".to_string(),
            max_connections: 5,
            db_workers: 8,
        }
    }
}
