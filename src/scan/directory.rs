//! Directory scanning on top of [`scan_all`].

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::scan::pool::{Scanned, scan_all};

/// Runs every regular file directly inside `dir` (non-recursive) through `read`.
///
/// Results are sorted by file name, since the pool itself returns them in
/// completion order. A missing directory yields an empty list.
pub async fn scan_directory<R, F, Fut>(
    dir: &Path,
    parallelism: usize,
    token: &CancellationToken,
    read: F,
) -> Result<Vec<Scanned<PathBuf, R>>, TaskError>
where
    R: Send + 'static,
    F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, TaskError>> + Send + 'static,
{
    let files = list_files(dir, token).await?;
    let mut results = scan_all(files, parallelism, token, read).await?;
    results.sort_by(|a, b| a.item.file_name().cmp(&b.item.file_name()));
    Ok(results)
}

async fn list_files(dir: &Path, token: &CancellationToken) -> Result<Vec<PathBuf>, TaskError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if token.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}
