//! SQLite Repository

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::executor::DbExecutor;
use crate::queries;
use crate::records::{Customer, Device, DeviceLog, ErrorReport};
use crate::repository::DeviceRepository;
use crate::{schema, StorageConfig, StorageError};

/// `DeviceRepository` backed by a SQLite connection pool
#[derive(Clone)]
pub struct SqliteDeviceRepository {
    executor: DbExecutor,
}

impl SqliteDeviceRepository {
    /// Wrap an existing pool. The schema must already be applied.
    pub fn new(pool: SqlitePool, db_workers: usize) -> Self {
        Self {
            executor: DbExecutor::new(pool, db_workers),
        }
    }

    /// Open the configured database and apply the schema
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        schema::apply(&pool).await?;

        info!(
            "Connected to {} ({} connections, {} db workers)",
            config.database_url, config.max_connections, config.db_workers
        );
        Ok(Self::new(pool, config.db_workers))
    }

    /// Private in-memory database, mainly for tests.
    ///
    /// Uses a single connection that never expires, since each SQLite
    /// in-memory connection is its own database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        schema::apply(&pool).await?;
        Ok(Self::new(pool, 1))
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        self.executor.pool()
    }
}

#[async_trait]
impl DeviceRepository for SqliteDeviceRepository {
    async fn add_customer(&self, customer: Customer) -> Result<Option<Customer>, StorageError> {
        self.executor
            .transaction("add_customer", move |conn| {
                Box::pin(queries::insert_customer(conn, customer))
            })
            .await
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StorageError> {
        self.executor
            .transaction("list_customers", |conn| Box::pin(queries::select_customers(conn)))
            .await
    }

    async fn add_device(&self, device: Device) -> Result<Device, StorageError> {
        self.executor
            .transaction("add_device", move |conn| {
                Box::pin(queries::insert_device(conn, device))
            })
            .await
    }

    async fn list_devices(&self) -> Result<Vec<Device>, StorageError> {
        self.executor
            .transaction("list_devices", |conn| Box::pin(queries::select_valid_devices(conn)))
            .await
    }

    async fn remove_device(&self, id: i64) -> Result<i64, StorageError> {
        self.executor
            .transaction("remove_device", move |conn| {
                Box::pin(queries::invalidate_device(conn, id))
            })
            .await
    }

    async fn update_device(&self, log: DeviceLog) -> Result<DeviceLog, StorageError> {
        self.executor
            .transaction("update_device", move |conn| {
                Box::pin(queries::insert_device_log(conn, log))
            })
            .await
    }

    async fn check_device(&self, device_id: i64) -> Result<Option<DeviceLog>, StorageError> {
        self.executor
            .transaction("check_device", move |conn| {
                Box::pin(queries::select_latest_log(conn, device_id))
            })
            .await
    }

    async fn record_error(&self, report: ErrorReport) -> Result<ErrorReport, StorageError> {
        self.executor
            .transaction("record_error", move |conn| {
                Box::pin(queries::insert_error_report(conn, report))
            })
            .await
    }

    async fn list_errors(&self, device_id: i64) -> Result<Vec<ErrorReport>, StorageError> {
        self.executor
            .transaction("list_errors", move |conn| {
                Box::pin(queries::select_error_reports(conn, device_id))
            })
            .await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{STATUS_ACTIVE, STATUS_INVALID};

    async fn repo() -> SqliteDeviceRepository {
        SqliteDeviceRepository::in_memory().await.unwrap()
    }

    fn customer(id: i64, name: &str) -> Customer {
        Customer {
            id,
            name: name.to_string(),
        }
    }

    fn device(id: i64, customer_id: i64) -> Device {
        Device {
            id,
            customer_id,
            description: Some("test device for quality inspection".to_string()),
            status: STATUS_ACTIVE.to_string(),
            update_at: 1_000,
        }
    }

    fn log(device_id: i64, status: &str, hours: u32) -> DeviceLog {
        DeviceLog {
            id: None,
            device_id,
            status: status.to_string(),
            execution_hours: hours,
            error: None,
            update_at: 2_000,
        }
    }

    async fn raw_status(repo: &SqliteDeviceRepository, id: i64) -> Option<String> {
        sqlx::query_scalar("SELECT status FROM device WHERE id = ?")
            .bind(id)
            .fetch_optional(repo.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_and_list_customers() {
        let repo = repo().await;
        let added = repo.add_customer(customer(1, "acme")).await.unwrap();
        assert_eq!(added, Some(customer(1, "acme")));

        let customers = repo.list_customers().await.unwrap();
        assert_eq!(customers, vec![customer(1, "acme")]);
    }

    #[tokio::test]
    async fn test_duplicate_customer_name_rejected() {
        let repo = repo().await;
        repo.add_customer(customer(1, "acme")).await.unwrap();

        let second = repo.add_customer(customer(2, "acme")).await.unwrap();
        assert!(second.is_none());

        let named: Vec<_> = repo
            .list_customers()
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.name == "acme")
            .collect();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].id, 1);
    }

    #[tokio::test]
    async fn test_duplicate_customer_id_is_fault() {
        let repo = repo().await;
        repo.add_customer(customer(1, "acme")).await.unwrap();

        let result = repo.add_customer(customer(1, "globex")).await;
        assert!(matches!(result, Err(StorageError::Database(_))));
    }

    #[tokio::test]
    async fn test_removed_device_hidden_but_kept() {
        let repo = repo().await;
        repo.add_device(device(10, 1)).await.unwrap();
        repo.add_device(device(11, 1)).await.unwrap();

        assert_eq!(repo.remove_device(10).await.unwrap(), 10);

        let ids: Vec<i64> = repo.list_devices().await.unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![11]);
        assert_eq!(raw_status(&repo, 10).await.as_deref(), Some(STATUS_INVALID));
    }

    #[tokio::test]
    async fn test_remove_refreshes_update_at() {
        let repo = repo().await;
        repo.add_device(device(10, 1)).await.unwrap();
        repo.remove_device(10).await.unwrap();

        let update_at: i64 = sqlx::query_scalar("SELECT update_at FROM device WHERE id = 10")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert!(update_at > 1_000);
    }

    #[tokio::test]
    async fn test_remove_unknown_device_returns_id() {
        let repo = repo().await;
        assert_eq!(repo.remove_device(99).await.unwrap(), 99);
        assert!(raw_status(&repo, 99).await.is_none());
    }

    #[tokio::test]
    async fn test_device_inserted_invalid_never_listed() {
        let repo = repo().await;
        let mut hidden = device(1, 1);
        hidden.status = STATUS_INVALID.to_string();
        repo.add_device(hidden).await.unwrap();
        repo.add_device(device(2, 1)).await.unwrap();

        let devices = repo.list_devices().await.unwrap();
        assert!(devices.iter().all(|d| !d.is_invalid()));
        assert_eq!(devices.len(), 1);
    }

    #[tokio::test]
    async fn test_update_device_projects_status() {
        let repo = repo().await;
        repo.add_device(device(10, 1)).await.unwrap();

        let stored = repo.update_device(log(10, "WARN", 5)).await.unwrap();
        assert!(stored.id.is_some());
        assert_eq!(stored.status, "WARN");

        let devices = repo.list_devices().await.unwrap();
        assert_eq!(devices[0].status, "WARN");
        assert_eq!(devices[0].update_at, 2_000);
    }

    #[tokio::test]
    async fn test_check_device_returns_latest() {
        let repo = repo().await;
        repo.add_device(device(10, 1)).await.unwrap();

        repo.update_device(log(10, "ACTIVE", 1)).await.unwrap();
        repo.update_device(log(10, "WARN", 2)).await.unwrap();
        let last = repo.update_device(log(10, "FAULT", 3)).await.unwrap();

        let latest = repo.check_device(10).await.unwrap().unwrap();
        assert_eq!(latest, last);
        assert_eq!(raw_status(&repo, 10).await.as_deref(), Some("FAULT"));
    }

    #[tokio::test]
    async fn test_check_device_prefers_highest_id() {
        let repo = repo().await;
        repo.add_device(device(10, 1)).await.unwrap();

        let mut high = log(10, "HIGH", 1);
        high.id = Some(500);
        repo.update_device(high).await.unwrap();
        let mut low = log(10, "LOW", 1);
        low.id = Some(100);
        repo.update_device(low).await.unwrap();

        let latest = repo.check_device(10).await.unwrap().unwrap();
        assert_eq!(latest.id, Some(500));
    }

    #[tokio::test]
    async fn test_concurrent_updates_stay_consistent() {
        let repo = repo().await;
        repo.add_device(device(10, 1)).await.unwrap();

        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.update_device(log(10, &format!("S{}", i), i)).await
                })
            })
            .collect();
        let mut stored = Vec::new();
        for handle in handles {
            stored.push(handle.await.unwrap().unwrap());
        }

        let newest = stored.iter().max_by_key(|l| l.id).unwrap();
        let latest = repo.check_device(10).await.unwrap().unwrap();
        assert_eq!(&latest, newest);
        assert_eq!(raw_status(&repo, 10).await, Some(latest.status));
    }

    #[tokio::test]
    async fn test_check_device_without_logs() {
        let repo = repo().await;
        repo.add_device(device(10, 1)).await.unwrap();
        assert!(repo.check_device(10).await.unwrap().is_none());
        assert!(repo.check_device(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_after_remove_is_rejected() {
        let repo = repo().await;
        repo.add_device(device(10, 1)).await.unwrap();
        repo.remove_device(10).await.unwrap();

        let result = repo.update_device(log(10, STATUS_ACTIVE, 1)).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        assert!(repo.list_devices().await.unwrap().is_empty());
        assert_eq!(raw_status(&repo, 10).await.as_deref(), Some(STATUS_INVALID));
        assert!(repo.check_device(10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_device_writes_nothing() {
        let repo = repo().await;
        let result = repo.update_device(log(77, "WARN", 1)).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        let logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM device_log")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(logs, 0);
    }

    #[tokio::test]
    async fn test_error_reports() {
        let repo = repo().await;
        for message in ["overheat", "sensor offline"] {
            repo.record_error(ErrorReport {
                id: None,
                device_id: 10,
                error: message.to_string(),
                update_at: 3_000,
            })
            .await
            .unwrap();
        }
        repo.record_error(ErrorReport {
            id: None,
            device_id: 11,
            error: "other".to_string(),
            update_at: 3_000,
        })
        .await
        .unwrap();

        let reports = repo.list_errors(10).await.unwrap();
        let messages: Vec<&str> = reports.iter().map(|r| r.error.as_str()).collect();
        assert_eq!(messages, vec!["overheat", "sensor offline"]);
        assert!(reports.iter().all(|r| r.id.is_some()));
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let repo = repo().await;
        repo.add_customer(customer(1, "acme")).await.unwrap();
        repo.add_device(Device {
            id: 10,
            customer_id: 1,
            description: None,
            status: STATUS_ACTIVE.to_string(),
            update_at: 1_000,
        })
        .await
        .unwrap();

        let stored = repo.update_device(log(10, "WARN", 5)).await.unwrap();
        assert_eq!(repo.check_device(10).await.unwrap(), Some(stored));

        let devices = repo.list_devices().await.unwrap();
        let d10 = devices.iter().find(|d| d.id == 10).unwrap();
        assert_eq!(d10.status, "WARN");

        repo.remove_device(10).await.unwrap();
        assert!(repo.list_devices().await.unwrap().iter().all(|d| d.id != 10));
    }

    #[tokio::test]
    async fn test_ping() {
        let repo = repo().await;
        repo.ping().await.unwrap();
    }

    fn remove_db_files(path: &std::path::Path) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    fn file_config(name: &str, connections: u32) -> (std::path::PathBuf, StorageConfig) {
        let path = std::env::temp_dir()
            .join(format!("devmon-{}-{}.db", name, std::process::id()));
        remove_db_files(&path);
        let config = StorageConfig {
            database_url: format!("sqlite://{}", path.display()),
            max_connections: connections,
            db_workers: connections as usize,
        };
        (path, config)
    }

    #[tokio::test]
    async fn test_connect_creates_file_database() {
        let (path, config) = file_config("connect", 2);

        let repo = SqliteDeviceRepository::connect(&config).await.unwrap();
        repo.add_customer(customer(1, "acme")).await.unwrap();
        assert_eq!(repo.list_customers().await.unwrap().len(), 1);

        repo.pool().close().await;
        remove_db_files(&path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_names_insert_once() {
        let (path, config) = file_config("names", 4);
        let repo = SqliteDeviceRepository::connect(&config).await.unwrap();

        let handles: Vec<_> = (1..=8i64)
            .map(|id| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.add_customer(customer(id, "acme")).await })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_some() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(repo.list_customers().await.unwrap().len(), 1);

        repo.pool().close().await;
        remove_db_files(&path);
    }
}
