//! Database Schema
//!
//! Applied on every connect; each statement is idempotent.

use sqlx::SqlitePool;
use tracing::info;

use crate::StorageError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS customer (
        id INTEGER PRIMARY KEY NOT NULL,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS device (
        id INTEGER PRIMARY KEY NOT NULL,
        customer_id INTEGER NOT NULL,
        description TEXT,
        status TEXT NOT NULL,
        update_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS device_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        execution_hours INTEGER NOT NULL CHECK (execution_hours >= 0),
        error TEXT,
        update_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_device_log_device ON device_log (device_id, id)",
    "CREATE TABLE IF NOT EXISTS error_report (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id INTEGER NOT NULL,
        error TEXT NOT NULL,
        update_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_error_report_device ON error_report (device_id)",
];

/// Create tables and indexes if missing
pub async fn apply(pool: &SqlitePool) -> Result<(), StorageError> {
    for statement in SCHEMA {
        sqlx::query(*statement)
            .execute(pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
    }
    info!("Schema ready ({} statements)", SCHEMA.len());
    Ok(())
}
