//! # huddle-server
//!
//! HTTP backend for Huddle group spaces.
//!
//! This binary provides:
//! - **Account lifecycle**: registration, login, profile updates, renames
//! - **Group membership**: invite codes, join requests, approval, kicks
//! - **Group feeds**: posts with images, comments (optionally anonymous)
//! - **Contribution pools**: per-group pools with admin-approved entries
//! - **REST API** (axum) over a single SQLite database

mod api;
mod config;
mod error;
mod sessions;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use huddle_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::sessions::SessionRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,huddle_server=debug")),
        )
        .init();

    info!("Starting Huddle server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    info!(
        instance = %config.instance_name,
        registration_open = config.registration_open,
        page_size = config.page_size,
        "Instance settings"
    );

    // -----------------------------------------------------------------------
    // 3. Open the database
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database ready");
    }

    // -----------------------------------------------------------------------
    // 4. Application state for the HTTP API
    // -----------------------------------------------------------------------
    // All domain mutations go through one Mutex-guarded connection, which
    // serializes request handling against the store.
    let http_addr = config.http_addr;
    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        sessions: SessionRegistry::new(),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
