//! Input table download.

use std::path::{Path, PathBuf};

use crate::error::{io_err, StorageError};
use crate::store::ObjectStore;

/// What [`ensure_input`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The file already existed locally; nothing was downloaded.
    AlreadyPresent { path: PathBuf },
    /// The object was downloaded to `path`.
    Downloaded { path: PathBuf, bytes: usize },
}

/// Download `key` to `local_path` unless `local_path` already exists.
///
/// Writes to `<path>.tmp` then renames, so an interrupted download never
/// leaves a truncated input behind.
pub async fn ensure_input(
    store: &dyn ObjectStore,
    key: &str,
    local_path: &Path,
) -> Result<FetchOutcome, StorageError> {
    if local_path.exists() {
        tracing::info!(path = %local_path.display(), "input already present locally");
        return Ok(FetchOutcome::AlreadyPresent {
            path: local_path.to_path_buf(),
        });
    }

    let body = store.get(key).await?;

    if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.tmp", local_path.display()));
    tokio::fs::write(&tmp, &body)
        .await
        .map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, local_path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(local_path, e));
    }

    tracing::info!(key, path = %local_path.display(), bytes = body.len(), "downloaded input");
    Ok(FetchOutcome::Downloaded {
        path: local_path.to_path_buf(),
        bytes: body.len(),
    })
}
