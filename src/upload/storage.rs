//! Persisting uploaded files to disk.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{EssenError, EssenResult};
use crate::observability::metrics;

/// Open `path` for writing, creating it when absent.
///
/// An existing file is truncated, so the last upload with a given name wins.
pub async fn create_file_if_not_exist(path: &Path) -> EssenResult<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| EssenError::PathError(format!("open {}: {}", path.display(), e)))
}

/// Destination for a client-supplied filename inside `dir`.
///
/// Only the final path component of `filename` is kept.
pub fn upload_path(dir: &Path, filename: &str) -> EssenResult<PathBuf> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." {
        return Err(EssenError::PathError(format!(
            "invalid upload filename \"{}\"",
            filename
        )));
    }
    Ok(dir.join(base))
}

/// Write `data` to `<dir>/<filename>` and return the destination path.
///
/// Copy failures are logged and do not fail the call; only failing to
/// create the destination is an error.
pub async fn store_upload(dir: &Path, filename: &str, data: &[u8]) -> EssenResult<PathBuf> {
    let path = upload_path(dir, filename)?;
    let mut file = create_file_if_not_exist(&path).await?;

    let copied = match file.write_all(data).await {
        Ok(()) => file.flush().await.map(|_| data.len()),
        Err(e) => Err(e),
    };

    match copied {
        Ok(n) => {
            metrics::record_upload(n);
            tracing::info!(path = %path.display(), bytes = n, "Stored upload");
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Upload copy failed");
        }
    }

    Ok(path)
}
