//! Error Report Routes

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{ApiError, AppState};
use storage::ErrorReport;

/// Append an error report for a device
pub async fn record_error(
    State(state): State<Arc<AppState>>,
    Json(report): Json<ErrorReport>,
) -> Result<Json<ErrorReport>, ApiError> {
    let stored = state.repository.record_error(report).await?;
    Ok(Json(stored))
}

/// Error reports for a device, oldest first
pub async fn list_errors(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<i64>,
) -> Result<Json<Vec<ErrorReport>>, ApiError> {
    let reports = state.repository.list_errors(device_id).await?;
    Ok(Json(reports))
}
