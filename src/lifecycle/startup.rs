//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging and metrics from configuration
//! - Start the config watcher when a config file is in use
//! - Bind the listener and serve until a shutdown signal

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ConfigWatcher, EssenConfig};
use crate::http::{Handler, HttpServer};
use crate::lifecycle::{shutdown::Shutdown, signals::wait_for_signal};
use crate::observability::{logging, metrics};

/// Fatal errors while bringing the server up or running it.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("config watcher failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Run `handler` with `config` until SIGINT/SIGTERM.
///
/// When `config_path` is given the file is watched and upload directory
/// changes are applied without a restart.
pub async fn serve<H: Handler>(
    config: EssenConfig,
    config_path: Option<&Path>,
    handler: H,
) -> Result<(), StartupError> {
    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.server.bind_address,
        max_body_bytes = config.server.max_body_bytes,
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.server.bind_address.clone();
    let server = HttpServer::new(config, handler);

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = match config_path {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path, server.uploads());
            let handle = watcher.run()?;
            tokio::spawn(async move {
                while let Some(update) = updates.recv().await {
                    tracing::info!(
                        upload = ?update.upload.as_ref().map(|u| u.upload_dir.clone()),
                        "Configuration reloaded"
                    );
                }
            });
            Some(handle)
        }
        None => None,
    };

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await.map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}
