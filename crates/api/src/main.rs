//! Device Monitor - Main Entry Point

use api::{init_logging, run_server, ServiceConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    init_logging(&config.log_level);

    info!("=== Device Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_url);

    run_server(config).await
}
