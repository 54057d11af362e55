//! Customer Routes

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{ApiError, AppState};
use storage::Customer;

/// Add a customer. Responds with `null` when the name is taken.
pub async fn add_customer(
    State(state): State<Arc<AppState>>,
    Json(customer): Json<Customer>,
) -> Result<Json<Option<Customer>>, ApiError> {
    let added = state.repository.add_customer(customer).await?;
    Ok(Json(added))
}

/// List all customers
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = state.repository.list_customers().await?;
    Ok(Json(customers))
}
