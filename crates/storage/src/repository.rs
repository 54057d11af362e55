//! Repository Contract

use async_trait::async_trait;

use crate::records::{Customer, Device, DeviceLog, ErrorReport};
use crate::StorageError;

/// Data access for customers, devices and their logs.
///
/// Every call runs as exactly one atomic transaction.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Insert a customer. Returns `None` when the name is already taken.
    async fn add_customer(&self, customer: Customer) -> Result<Option<Customer>, StorageError>;

    /// All customers, in storage order
    async fn list_customers(&self) -> Result<Vec<Customer>, StorageError>;

    /// Insert a device without any reference checks
    async fn add_device(&self, device: Device) -> Result<Device, StorageError>;

    /// All devices that have not been removed
    async fn list_devices(&self) -> Result<Vec<Device>, StorageError>;

    /// Soft-delete a device. Returns `id` whether or not a row matched.
    async fn remove_device(&self, id: i64) -> Result<i64, StorageError>;

    /// Record a status update: the device takes the log's status and
    /// timestamp, and the log is appended. Fails with `NotFound` if the
    /// device does not exist.
    async fn update_device(&self, log: DeviceLog) -> Result<DeviceLog, StorageError>;

    /// Latest log for a device, if any
    async fn check_device(&self, device_id: i64) -> Result<Option<DeviceLog>, StorageError>;

    /// Append an error report
    async fn record_error(&self, report: ErrorReport) -> Result<ErrorReport, StorageError>;

    /// Error reports for a device, oldest first
    async fn list_errors(&self, device_id: i64) -> Result<Vec<ErrorReport>, StorageError>;

    /// Cheap connectivity check used by the health endpoint
    async fn ping(&self) -> Result<(), StorageError>;
}
