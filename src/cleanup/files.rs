//! Blocking filesystem helpers for the cleaner, run on the blocking pool.

use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::cleanup::error::CleanupError;

/// Identity of a path for set comparison.
///
/// Existing files resolve through symlinks; missing ones fall back to the
/// absolute form.
pub fn canonical_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Recursively lists the regular files under each of `roots` as canonical keys.
///
/// Missing roots contribute nothing; unreadable entries are skipped.
pub async fn collect_files(
    roots: Vec<PathBuf>,
    token: &CancellationToken,
) -> Result<Vec<PathBuf>, CleanupError> {
    let token = token.clone();
    tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        for root in roots {
            if !root.exists() {
                continue;
            }
            for entry in WalkDir::new(&root) {
                if token.is_cancelled() {
                    return Err(CleanupError::Canceled);
                }
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable entry");
                        continue;
                    }
                };
                if entry.file_type().is_file() {
                    files.push(canonical_key(entry.path()));
                }
            }
        }
        Ok(files)
    })
    .await
    .map_err(|e| io::Error::other(format!("file collector panicked: {e}")))?
}

/// Canonical keys for `paths`, computed off the async workers.
pub async fn canonical_keys(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>, CleanupError> {
    tokio::task::spawn_blocking(move || paths.iter().map(|p| canonical_key(p)).collect())
        .await
        .map_err(|e| CleanupError::Io(io::Error::other(format!("canonicalize panicked: {e}"))))
}

/// Formats a byte count in binary units with two decimals ("1.50 MB").
///
/// ```
/// use launchvisor::cleanup::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_owned();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}
