//! Publishing generated files.
//!
//! Every file is written to a hidden temporary sibling and renamed over the
//! target, so readers see either the previous file or the complete new one.
//! A run interrupted between the write and the rename leaves the temporary
//! file behind; `ensure_dir` removes such leftovers at the start of the next
//! run.

use std::path::{Path, PathBuf};

use crate::errors::{AppError, Result};

/// Directory holding the per-location `.ics` files.
pub fn calendars_dir(output_dir: &Path) -> PathBuf {
    output_dir.join("calendars")
}

pub fn status_path(output_dir: &Path) -> PathBuf {
    output_dir.join("status.json")
}

/// Create `dir` and its parents if needed, then clear stale temporary files.
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::write(dir, e))?;
    remove_stale_temp_files(dir).await
}

async fn remove_stale_temp_files(dir: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| AppError::write(dir, e))?;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => return Err(AppError::write(dir, e)),
        };
        if !is_temp_name(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let path = entry.path();
        tracing::warn!("Removing leftover temporary file {}", path.display());
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }

    Ok(())
}

/// Replace `path` with `contents`.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = temp_path(path)?;

    if let Err(e) = tokio::fs::write(&tmp_path, contents).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(AppError::write(path, e));
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(AppError::write(path, e));
    }

    tracing::debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// Temporary file in the same directory, so the rename never crosses filesystems.
fn temp_path(path: &Path) -> Result<PathBuf> {
    let Some(file_name) = path.file_name() else {
        let e = std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name");
        return Err(AppError::write(path, e));
    };
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(".tmp")
}
