//! Query functions, one per statement group.
//!
//! Each takes the connection of an already-open transaction.

use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::records::{now_millis, Customer, Device, DeviceLog, ErrorReport, STATUS_INVALID};
use crate::StorageError;

// ==================== CUSTOMER QUERIES ====================

pub async fn insert_customer(
    conn: &mut SqliteConnection,
    customer: Customer,
) -> Result<Option<Customer>, StorageError> {
    let result = sqlx::query(
        "INSERT INTO customer (id, name) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
    )
    .bind(customer.id)
    .bind(&customer.name)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!("Customer name {:?} already exists, not inserted", customer.name);
        return Ok(None);
    }

    debug!("Inserted customer {}", customer.id);
    Ok(Some(customer))
}

pub async fn select_customers(conn: &mut SqliteConnection) -> Result<Vec<Customer>, StorageError> {
    let customers = sqlx::query_as::<_, Customer>("SELECT id, name FROM customer")
        .fetch_all(&mut *conn)
        .await?;
    Ok(customers)
}

// ==================== DEVICE QUERIES ====================

pub async fn insert_device(
    conn: &mut SqliteConnection,
    device: Device,
) -> Result<Device, StorageError> {
    sqlx::query(
        "INSERT INTO device (id, customer_id, description, status, update_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(device.id)
    .bind(device.customer_id)
    .bind(&device.description)
    .bind(&device.status)
    .bind(device.update_at)
    .execute(&mut *conn)
    .await?;

    debug!("Inserted device {} for customer {}", device.id, device.customer_id);
    Ok(device)
}

pub async fn select_valid_devices(conn: &mut SqliteConnection) -> Result<Vec<Device>, StorageError> {
    let devices = sqlx::query_as::<_, Device>(
        "SELECT id, customer_id, description, status, update_at
         FROM device WHERE status != ?",
    )
    .bind(STATUS_INVALID)
    .fetch_all(&mut *conn)
    .await?;
    Ok(devices)
}

/// Set a device's status and timestamp. Returns the number of rows touched.
pub async fn set_device_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: &str,
    update_at: i64,
) -> Result<u64, StorageError> {
    let result = sqlx::query("UPDATE device SET status = ?, update_at = ? WHERE id = ?")
        .bind(status)
        .bind(update_at)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn invalidate_device(conn: &mut SqliteConnection, id: i64) -> Result<i64, StorageError> {
    let updated = set_device_status(conn, id, STATUS_INVALID, now_millis()).await?;
    if updated == 0 {
        warn!("Remove requested for unknown device {}", id);
    } else {
        debug!("Device {} marked {}", id, STATUS_INVALID);
    }
    Ok(id)
}

// ==================== DEVICE LOG QUERIES ====================

/// Copy a log's status onto its device. Removed devices are left untouched.
async fn project_log_status(
    conn: &mut SqliteConnection,
    log: &DeviceLog,
) -> Result<u64, StorageError> {
    let result = sqlx::query(
        "UPDATE device SET status = ?, update_at = ? WHERE id = ? AND status != ?",
    )
    .bind(&log.status)
    .bind(log.update_at)
    .bind(log.device_id)
    .bind(STATUS_INVALID)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Apply the log's status to its device, then append the log.
///
/// Fails with `NotFound` when the device is unknown or removed.
pub async fn insert_device_log(
    conn: &mut SqliteConnection,
    mut log: DeviceLog,
) -> Result<DeviceLog, StorageError> {
    if project_log_status(conn, &log).await? == 0 {
        return Err(StorageError::NotFound(format!("device {}", log.device_id)));
    }

    let result = sqlx::query(
        "INSERT INTO device_log (id, device_id, status, execution_hours, error, update_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(log.id)
    .bind(log.device_id)
    .bind(&log.status)
    .bind(log.execution_hours)
    .bind(&log.error)
    .bind(log.update_at)
    .execute(&mut *conn)
    .await?;

    log.id = Some(result.last_insert_rowid());
    debug!(
        "Device {} now {} (log {})",
        log.device_id,
        log.status,
        result.last_insert_rowid()
    );
    Ok(log)
}

pub async fn select_latest_log(
    conn: &mut SqliteConnection,
    device_id: i64,
) -> Result<Option<DeviceLog>, StorageError> {
    let log = sqlx::query_as::<_, DeviceLog>(
        "SELECT id, device_id, status, execution_hours, error, update_at
         FROM device_log WHERE device_id = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(device_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(log)
}

// ==================== ERROR REPORT QUERIES ====================

pub async fn insert_error_report(
    conn: &mut SqliteConnection,
    mut report: ErrorReport,
) -> Result<ErrorReport, StorageError> {
    let result = sqlx::query(
        "INSERT INTO error_report (id, device_id, error, update_at) VALUES (?, ?, ?, ?)",
    )
    .bind(report.id)
    .bind(report.device_id)
    .bind(&report.error)
    .bind(report.update_at)
    .execute(&mut *conn)
    .await?;

    report.id = Some(result.last_insert_rowid());
    Ok(report)
}

pub async fn select_error_reports(
    conn: &mut SqliteConnection,
    device_id: i64,
) -> Result<Vec<ErrorReport>, StorageError> {
    let reports = sqlx::query_as::<_, ErrorReport>(
        "SELECT id, device_id, error, update_at
         FROM error_report WHERE device_id = ? ORDER BY id",
    )
    .bind(device_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(reports)
}
