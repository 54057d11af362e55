//! Stored Records
//!
//! Row types shared by the repository and the HTTP layer. Field names are
//! serialized in camelCase to match the JSON wire format.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status written by `add_device` when the caller does not supply one
pub const STATUS_ACTIVE: &str = "ACTIVE";

/// Sentinel status marking a logically removed device
pub const STATUS_INVALID: &str = "INVALID";

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn default_status() -> String {
    STATUS_ACTIVE.to_string()
}

/// Customer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
}

/// Device record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    /// Owning customer (advisory, not enforced)
    pub customer_id: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    /// Last status change (ms since epoch)
    #[serde(default = "now_millis")]
    pub update_at: i64,
}

impl Device {
    /// Whether this device has been soft-deleted
    pub fn is_invalid(&self) -> bool {
        self.status == STATUS_INVALID
    }
}

/// Device status log entry
///
/// `id` is assigned by storage when omitted; the entry with the highest id
/// for a device is its latest status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLog {
    #[serde(default)]
    pub id: Option<i64>,
    pub device_id: i64,
    pub status: String,
    #[serde(default)]
    pub execution_hours: u32,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default = "now_millis")]
    pub update_at: i64,
}

/// Error reported by a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    #[serde(default)]
    pub id: Option<i64>,
    pub device_id: i64,
    pub error: String,
    #[serde(default = "now_millis")]
    pub update_at: i64,
}
