//! Configuration file watcher for hot reload.
//!
//! Only the upload directory is applied live. Server and observability
//! changes are reported on the update channel and take effect on restart.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::EssenConfig;
use crate::upload::UploadSettings;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    uploads: UploadSettings,
    update_tx: mpsc::UnboundedSender<EssenConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher that updates `uploads` on reload.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path, uploads: UploadSettings) -> (Self, mpsc::UnboundedReceiver<EssenConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                uploads,
                update_tx,
            },
            update_rx,
        )
    }

    /// Load the file and apply it. Invalid files keep the current settings.
    pub fn reload(&self) {
        match load_config(&self.path) {
            Ok(new_config) => {
                apply_upload(&self.uploads, &new_config);
                let _ = self.update_tx.send(new_config);
            }
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Failed to reload config, keeping current configuration");
            }
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// Watching stops when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        self.reload();
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

fn apply_upload(uploads: &UploadSettings, config: &EssenConfig) {
    if let Some(upload) = &config.upload {
        let changed = uploads.get().map_or(true, |current| *current != *upload);
        if changed {
            uploads.set(upload.clone());
        }
    }
}
