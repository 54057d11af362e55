//! Device Monitor API Server
//!
//! REST API for adding customers and devices, posting device status updates
//! and polling the latest status of a device.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod error;
mod routes;

pub use crate::config::ServiceConfig;
pub use crate::error::ApiError;

use storage::{DeviceRepository, SqliteDeviceRepository};

/// Application state shared across handlers
pub struct AppState {
    /// Device repository
    pub repository: Arc<dyn DeviceRepository>,
    /// Prometheus recorder handle, when one is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(repository: Arc<dyn DeviceRepository>) -> Self {
        Self {
            repository,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Attach a Prometheus handle for `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/add/customer", post(routes::customers::add_customer))
        .route("/customers", get(routes::customers::list_customers))
        .route("/add/device", post(routes::devices::add_device))
        .route("/devices", get(routes::devices::list_devices))
        .route("/remove/:id", post(routes::devices::remove_device))
        .route("/update", post(routes::devices::update_device))
        .route("/check/:id", get(routes::devices::check_device))
        .route("/error", post(routes::errors::record_error))
        .route("/errors/:id", get(routes::errors::list_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_handler() -> &'static str {
    "Welcome to the device monitor platform"
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let (status, database) = match state.repository.ping().await {
        Ok(()) => (
            StatusCode::OK,
            ComponentHealth {
                status: "ok".to_string(),
                detail: None,
            },
        ),
        Err(e) => {
            warn!("Health check: database unreachable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ComponentHealth {
                    status: "error".to_string(),
                    detail: Some(e.to_string()),
                },
            )
        }
    };

    let response = HealthResponse {
        status: if status.is_success() { "healthy" } else { "degraded" }.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        database,
    };

    (status, Json(response))
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

/// Initialize logging at the given level (falls back to INFO)
pub fn init_logging(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("Tracing subscriber already installed");
    }
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder not installed: {}", e);
            None
        }
    }
}

/// Run the server until Ctrl-C
pub async fn run_server(config: ServiceConfig) -> anyhow::Result<()> {
    let repository = SqliteDeviceRepository::connect(&config.storage()).await?;

    let mut state = AppState::new(Arc::new(repository));
    if let Some(handle) = install_metrics() {
        state = state.with_metrics(handle);
    }
    let app = create_router(Arc::new(state));

    info!("Starting API server on {}", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
