//! Tile World Server - authoritative top-down tile world
//!
//! This is the main entry point for the server. It handles:
//! - WebSocket sessions: one player and one frame loop per connection
//! - HTTP endpoints for health, the loaded map and the map editor
//! - Loading the map file and probing tile images at startup

mod app;
mod config;
mod http;
mod map;
mod util;
mod world;
mod ws;

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::state::collision_table;
use crate::app::AppState;
use crate::config::{Config, LogFormat};
use crate::http::build_router;
use crate::map::{AssetCatalog, WorldMap};
use crate::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level, config.log_format);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Tile World Server");
    info!("Server address: {}", config.server_addr);

    // Missing images only degrade drawing
    let mut catalog = AssetCatalog::standard(config.editor.tile_size);
    catalog.probe(&config.asset_dir).await;

    // A map that cannot be loaded is fatal
    let table = collision_table(&config, &catalog);
    let world = WorldMap::load(&config.map_path, &table)
        .await
        .with_context(|| format!("failed to load map {}", config.map_path.display()))?;

    info!(
        input_mode = ?config.world.input_mode,
        frame_rate = config.world.frame_rate,
        collidable_types = table.len(),
        "World ready"
    );

    // Create application state
    let addr: SocketAddr = config.server_addr;
    let state = AppState::new(config, catalog, world);

    // Build router
    let router = build_router(state);

    // Start server
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
