//! # gatepass-server
//!
//! HTTP server for the gatepass visitor pass system.
//!
//! This binary provides:
//! - REST API for visitor registration, listing and gate scans
//! - OpenAPI document at `/api/openapi.json`
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package gatepass-server
//!
//! # With an explicit config file
//! GATEPASS_CONFIG=./gatepass.toml ./gatepass-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;

use gatepass_core::Config;
use gatepass_server::{api, logging, state::AppState};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os("GATEPASS_CONFIG").map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    logging::init(&config.logging, &config.log_dir())?;

    info!(
        storage = ?config.storage.backend,
        timezone = %config.site.timezone,
        "Starting gatepass-server"
    );

    let addr = config.server.socket_addr()?;
    let state = AppState::from_config(config).await?.shared();
    let app = api::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
