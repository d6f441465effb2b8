//! One-way mirroring of a local directory into an [`ObjectStore`].
//!
//! ## `sync_dir` protocol
//!
//! 1. Check the local directory exists.
//! 2. Walk it recursively; each file maps to `<prefix>/<relative path>`.
//! 3. Strict mode: compare the file count with the expected row count and
//!    abort before any upload on mismatch.
//! 4. List every remote key under the prefix.
//! 5. Upload only local keys missing remotely, at most `concurrency` at once.
//! 6. Collect each upload's outcome independently; failures are reported,
//!    never propagated.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::{io_err, StorageError};
use crate::store::ObjectStore;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub remote_prefix: String,
    /// Upper bound on in-flight uploads (values below 1 are treated as 1).
    pub concurrency: usize,
    /// Strict mode: number of local files the manifest says should exist.
    pub expected_files: Option<usize>,
    /// Plan uploads without performing them.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            remote_prefix: String::new(),
            concurrency: 10,
            expected_files: None,
            dry_run: false,
        }
    }
}

/// A local file and the remote key it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadPlan {
    pub local_path: PathBuf,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub key: String,
    pub error: String,
}

/// Outcome of one [`sync_dir`] call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub local_files: usize,
    pub already_remote: usize,
    /// Uploads that would run; filled in dry-run mode only.
    pub planned: Vec<UploadPlan>,
    pub uploaded: Vec<String>,
    pub failed: Vec<UploadFailure>,
    pub duration_ms: u128,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Key mapping
// ---------------------------------------------------------------------------

/// `<prefix>/<relative>` with `/` separators and no duplicate slashes.
pub fn remote_key(prefix: &str, relative: &Path) -> String {
    let rel = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
        .replace('\\', "/");
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        rel
    } else {
        format!("{prefix}/{rel}")
    }
}

/// Every regular file under `dir`, sorted for deterministic planning.
pub fn collect_local_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut out = Vec::new();
    collect_into(dir, &mut out)?;
    out.sort();
    Ok(out)
}

fn collect_into(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), StorageError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_into(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// Local files whose key is not in `remote`.
pub fn plan_uploads(
    local_dir: &Path,
    files: &[PathBuf],
    prefix: &str,
    remote: &HashSet<String>,
) -> Vec<UploadPlan> {
    files
        .iter()
        .filter_map(|path| {
            let rel = path.strip_prefix(local_dir).unwrap_or(path.as_path());
            let key = remote_key(prefix, rel);
            (!remote.contains(&key)).then(|| UploadPlan {
                local_path: path.clone(),
                key,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// sync_dir
// ---------------------------------------------------------------------------

/// Mirror `local_dir` into `store` under `options.remote_prefix`.
///
/// Returns `Err` only when a precondition fails (missing directory, strict
/// count mismatch, remote listing failure). Individual upload failures are
/// in [`SyncReport::failed`].
pub async fn sync_dir(
    local_dir: &Path,
    store: Arc<dyn ObjectStore>,
    options: &SyncOptions,
) -> Result<SyncReport, StorageError> {
    let started = Instant::now();

    if !local_dir.is_dir() {
        return Err(StorageError::MissingDirectory {
            path: local_dir.to_path_buf(),
        });
    }

    let files = collect_local_files(local_dir)?;
    if let Some(expected) = options.expected_files {
        if expected != files.len() {
            return Err(StorageError::FileCountMismatch {
                path: local_dir.to_path_buf(),
                local: files.len(),
                expected,
            });
        }
    }

    let remote: HashSet<String> = store
        .list(options.remote_prefix.trim_matches('/'))
        .await?
        .into_iter()
        .collect();
    let plans = plan_uploads(local_dir, &files, &options.remote_prefix, &remote);

    let mut report = SyncReport {
        local_files: files.len(),
        already_remote: files.len() - plans.len(),
        ..SyncReport::default()
    };

    if options.dry_run {
        for plan in &plans {
            tracing::info!(key = %plan.key, "[dry-run] would upload");
        }
        report.planned = plans;
        report.duration_ms = started.elapsed().as_millis();
        return Ok(report);
    }

    let mut outcomes = stream::iter(plans)
        .map(|plan| {
            let store = Arc::clone(&store);
            async move {
                let result = upload_one(store.as_ref(), &plan).await;
                (plan, result)
            }
        })
        .buffer_unordered(options.concurrency.max(1));

    while let Some((plan, result)) = outcomes.next().await {
        match result {
            Ok(()) => {
                tracing::info!(key = %plan.key, "uploaded");
                report.uploaded.push(plan.key);
            }
            Err(err) => {
                tracing::warn!(
                    key = %plan.key,
                    path = %plan.local_path.display(),
                    error = %err,
                    "upload failed"
                );
                report.failed.push(UploadFailure {
                    key: plan.key,
                    error: err.to_string(),
                });
            }
        }
    }

    report.uploaded.sort();
    report.duration_ms = started.elapsed().as_millis();
    tracing::info!(
        uploaded = report.uploaded.len(),
        failed = report.failed.len(),
        already_remote = report.already_remote,
        "sync finished"
    );
    Ok(report)
}

async fn upload_one(store: &dyn ObjectStore, plan: &UploadPlan) -> Result<(), StorageError> {
    let body = tokio::fs::read(&plan.local_path)
        .await
        .map_err(|e| io_err(&plan.local_path, e))?;
    store.put(&plan.key, body).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_prefix_and_relative_path() {
        assert_eq!(
            remote_key("batch_generated_images", Path::new("kitchen/001.png")),
            "batch_generated_images/kitchen/001.png"
        );
        assert_eq!(
            remote_key("/batch_generated_images/", Path::new("001.png")),
            "batch_generated_images/001.png"
        );
        assert_eq!(remote_key("", Path::new("a/b.png")), "a/b.png");
    }

    #[test]
    fn plan_skips_keys_already_remote() {
        let dir = Path::new("/out");
        let files = vec![
            PathBuf::from("/out/a.png"),
            PathBuf::from("/out/b.png"),
            PathBuf::from("/out/sub/c.png"),
        ];
        let remote: HashSet<String> = ["p/a.png", "p/b.png"].iter().map(|s| s.to_string()).collect();
        let plans = plan_uploads(dir, &files, "p", &remote);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].key, "p/sub/c.png");
    }
}
