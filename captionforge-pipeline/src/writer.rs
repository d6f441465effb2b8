//! Atomic file replacement.
//!
//! Write to `<path>.captionforge.tmp`, then rename over `<path>` (atomic on
//! POSIX). Parent directories are created as needed; the temp file is removed
//! if the rename fails.

use std::path::{Path, PathBuf};

use crate::error::{io_err, PipelineError};

pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let tmp = PathBuf::from(format!("{}.captionforge.tmp", path.display()));
    atomic_write_with_tmp(path, bytes, &tmp)
}

fn atomic_write_with_tmp(path: &Path, bytes: &[u8], tmp: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, bytes).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "atomic write");
    Ok(())
}
