//! # Aurum POS API server
//!
//! Startup sequence: load env config, initialize tracing, open the SQLite
//! pool (running migrations), build the router, serve until ctrl-c.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aurum_db::{Database, DbConfig};
use aurum_pos_api::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    info!(
        port = config.http_port,
        db = %config.database_path,
        "Starting Aurum POS API"
    );

    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("failed to open database")?;
    info!("Database ready");

    let app = aurum_pos_api::build_app(db.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.http_port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves when the process receives ctrl-c.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
