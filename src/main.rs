//! pingwired - target list daemon.
//!
//! Keeps per-conversation ping lists for a chat platform bridge: toggle
//! commands edit them, trigger messages ping the members still present,
//! and deletions prune them.

mod config;
mod error;
mod handlers;
mod http;
mod metrics;
mod network;
mod state;
mod telemetry;

use crate::config::Config;
use crate::network::Gateway;
use crate::state::{spawn_flush_task, TargetStore};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    telemetry::init_logging(&config.logging)?;
    metrics::init();

    info!(
        store = %config.store.path,
        bridge = %config.bridge.listen,
        "Starting pingwired"
    );

    // Any load failure other than a missing file leaves the lists unknown.
    let store = TargetStore::load(config.store.path()).await.map_err(|e| {
        error!(code = e.error_code(), error = %e, "Failed to load target list");
        e
    })?;
    let store = Arc::new(store);

    spawn_flush_task(Arc::clone(&store), config.store.flush_interval());

    if let Some(port) = config.metrics.port {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            http::run_http_server(port, store).await;
        });
    }

    let gateway = Gateway::bind(&config, Arc::clone(&store)).await?;
    info!(addr = %gateway.local_addr()?, "Waiting for bridge");

    tokio::select! {
        result = gateway.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown requested");
        }
    }

    if !store.flush_if_dirty().await {
        warn!(path = %store.path().display(), "Exiting with unsaved target list changes");
    }
    info!("Stopped");
    Ok(())
}

/// The config path is the first argument. Without one, a missing
/// `config.toml` means built-in defaults.
fn load_config() -> anyhow::Result<Config> {
    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => DEFAULT_CONFIG_PATH.to_string(),
        None => return Ok(Config::default()),
    };
    Config::load(&path).with_context(|| format!("failed to load config {path}"))
}
