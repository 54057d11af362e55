//! Device Routes

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::{ApiError, AppState};
use storage::{Device, DeviceLog};

/// Add a device
pub async fn add_device(
    State(state): State<Arc<AppState>>,
    Json(device): Json<Device>,
) -> Result<Json<Device>, ApiError> {
    let added = state.repository.add_device(device).await?;
    Ok(Json(added))
}

/// List devices that have not been removed
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = state.repository.list_devices().await?;
    Ok(Json(devices))
}

/// Soft-delete a device, responding with its id
pub async fn remove_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<i64>, ApiError> {
    let removed = state.repository.remove_device(id).await?;
    Ok(Json(removed))
}

/// Record a status update for a device
pub async fn update_device(
    State(state): State<Arc<AppState>>,
    Json(log): Json<DeviceLog>,
) -> Result<Json<DeviceLog>, ApiError> {
    debug!("Status {} reported for device {}", log.status, log.device_id);
    let stored = state.repository.update_device(log).await?;
    Ok(Json(stored))
}

/// Latest log for a device, or `null`
pub async fn check_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Option<DeviceLog>>, ApiError> {
    let latest = state.repository.check_device(id).await?;
    Ok(Json(latest))
}
