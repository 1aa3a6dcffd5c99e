//! Upload directory configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

/// Directory used when nothing was configured before the first upload.
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";

/// Where uploaded files are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Destination directory for uploaded files.
    pub upload_dir: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
        }
    }
}

impl UploadConfig {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }
}

/// Shared, lazily defaulted upload configuration.
///
/// Cloning is cheap and every clone observes the same configuration.
#[derive(Clone, Default)]
pub struct UploadSettings {
    inner: Arc<ArcSwapOption<UploadConfig>>,
}

impl UploadSettings {
    /// Create settings with nothing configured yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings that are already configured.
    pub fn with_config(config: UploadConfig) -> Self {
        let settings = Self::new();
        settings.set(config);
        settings
    }

    /// Explicitly set the configuration, replacing any previous value.
    pub fn set(&self, config: UploadConfig) {
        tracing::info!(upload_dir = %config.upload_dir.display(), "Upload directory configured");
        self.inner.store(Some(Arc::new(config)));
    }

    /// Current configuration, if any.
    pub fn get(&self) -> Option<Arc<UploadConfig>> {
        self.inner.load_full()
    }

    pub fn is_set(&self) -> bool {
        self.inner.load().is_some()
    }

    /// Return the configuration, installing the default if none is set.
    ///
    /// Concurrent callers agree on a single winner: only one default is
    /// ever stored, and an explicit `set` is never overwritten.
    pub fn get_or_init_default(&self) -> Arc<UploadConfig> {
        if let Some(config) = self.inner.load_full() {
            return config;
        }

        let default = Arc::new(UploadConfig::default());
        let previous = self
            .inner
            .compare_and_swap(&None::<Arc<UploadConfig>>, Some(Arc::clone(&default)));

        match &*previous {
            Some(existing) => Arc::clone(existing),
            None => {
                if let Err(e) = std::fs::create_dir_all(&default.upload_dir) {
                    tracing::warn!(
                        upload_dir = %default.upload_dir.display(),
                        error = %e,
                        "Failed to create default upload directory"
                    );
                }
                tracing::info!(
                    upload_dir = %default.upload_dir.display(),
                    "Using default upload directory"
                );
                default
            }
        }
    }
}

impl std::fmt::Debug for UploadSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSettings")
            .field("config", &self.get())
            .finish()
    }
}
