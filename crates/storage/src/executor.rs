//! Transactional Database Executor
//!
//! Runs each repository call as one transaction on a spawned task, gated by a
//! semaphore so at most `workers` calls touch the database at a time. The
//! caller only awaits the task's result.

use sqlx::{SqliteConnection, SqlitePool};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::StorageError;

/// Future returned by a transaction body, borrowing the open connection
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'c>>;

/// Bounded pool of database workers
#[derive(Clone)]
pub struct DbExecutor {
    pool: SqlitePool,
    permits: Arc<Semaphore>,
}

impl DbExecutor {
    /// Create an executor allowing `workers` concurrent transactions
    pub fn new(pool: SqlitePool, workers: usize) -> Self {
        Self {
            pool,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run `body` inside a single transaction on a worker task.
    ///
    /// The transaction commits when `body` succeeds and rolls back on any
    /// error. A panic inside the task rolls back (the transaction is dropped)
    /// and surfaces as `StorageError::Executor`.
    pub async fn transaction<T, F>(&self, op: &'static str, body: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> TxFuture<'c, T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let permits = Arc::clone(&self.permits);
        let started = Instant::now();

        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| StorageError::Executor(e.to_string()))?;

            let mut tx = pool.begin().await?;
            let outcome = body(&mut *tx).await;
            match outcome {
                Ok(value) => {
                    tx.commit().await?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback) = tx.rollback().await {
                        warn!("{}: rollback failed: {}", op, rollback);
                    }
                    Err(err)
                }
            }
        });

        let result = match handle.await {
            Ok(result) => result,
            Err(join) => Err(StorageError::Executor(join.to_string())),
        };

        let elapsed = started.elapsed();
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!("devmon_repository_calls_total", "op" => op, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("devmon_repository_call_seconds", "op" => op)
            .record(elapsed.as_secs_f64());
        debug!("{} finished in {:?} ({})", op, elapsed, outcome);

        result
    }
}
