//! # Asset reachability GC.
//!
//! Four stages, each a task of the [`TaskSystem`] run through
//! [`TaskSystem::run_pipeline`]:
//!
//! ```text
//! CollectFiles      walk libraries + assets roots          -> installed
//! CollectGameFiles  union of required files of all versions -> required
//! CompareFiles      installed - required, still existing   -> redundant
//! Cleanup           delete redundant, keep going on errors -> report
//! ```
//!
//! State lives in a fresh per-run context; deletion only ever runs after the
//! three collecting stages completed. Successful deletions are never rolled
//! back, failed ones surface as [`CleanupError::PartialDeletion`].

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::cleanup::catalog::VersionCatalog;
use crate::cleanup::error::CleanupError;
use crate::cleanup::files::{canonical_keys, collect_files, format_size};
use crate::core::{PipelineOutcome, TaskSystem};
use crate::error::TaskError;
use crate::tasks::{INDETERMINATE, TaskHandle, TaskSpec};

/// Stage ids, in execution order.
pub const STAGE_COLLECT_FILES: &str = "GameAssetCleaner.CollectFiles";
pub const STAGE_COLLECT_GAME_FILES: &str = "GameAssetCleaner.CollectGameFiles";
pub const STAGE_COMPARE_FILES: &str = "GameAssetCleaner.CompareFiles";
pub const STAGE_CLEANUP: &str = "GameAssetCleaner.Cleanup";

/// Roots scanned for installed files.
#[derive(Clone, Debug)]
pub struct CleanerConfig {
    /// Shared libraries directory.
    pub libraries_dir: PathBuf,
    /// Shared assets directory.
    pub assets_dir: PathBuf,
}

/// Result of a completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files removed.
    pub deleted: usize,
    /// Bytes freed by the removed files.
    pub reclaimed_bytes: u64,
}

impl CleanupReport {
    /// Reclaimed bytes in human-readable form.
    pub fn reclaimed(&self) -> String {
        format_size(self.reclaimed_bytes)
    }
}

#[derive(Default)]
struct RunState {
    installed: Mutex<Vec<PathBuf>>,
    required: Mutex<HashSet<PathBuf>>,
    redundant: Mutex<Vec<PathBuf>>,
    report: Mutex<CleanupReport>,
    failure: Mutex<Option<CleanupError>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RunState {
    /// Keeps the typed error for the caller and hands the stage a `TaskError`.
    fn fail(&self, err: CleanupError) -> TaskError {
        let task_err = TaskError::from(&err);
        *lock(&self.failure) = Some(err);
        task_err
    }
}

/// Removes library and asset files no installed version needs.
pub struct AssetCleaner {
    cfg: CleanerConfig,
    catalog: Arc<dyn VersionCatalog>,
}

impl AssetCleaner {
    /// Creates a cleaner over `catalog`.
    pub fn new(cfg: CleanerConfig, catalog: Arc<dyn VersionCatalog>) -> Self {
        Self { cfg, catalog }
    }

    /// Runs the four stages on `system`; cancel via `token`.
    pub async fn cleanup(
        &self,
        system: &TaskSystem,
        token: &CancellationToken,
    ) -> Result<CleanupReport, CleanupError> {
        let state = Arc::new(RunState::default());
        let stages = vec![
            self.collect_files_stage(&state),
            self.collect_game_files_stage(&state),
            compare_files_stage(&state),
            cleanup_stage(&state),
        ];

        let outcome = system.run_pipeline(stages, token).await?;
        let typed = lock(&state.failure).take();
        match outcome {
            PipelineOutcome::Completed => {
                let report = *lock(&state.report);
                tracing::info!(
                    deleted = report.deleted,
                    reclaimed = %report.reclaimed(),
                    "asset cleanup completed"
                );
                Ok(report)
            }
            PipelineOutcome::Cancelled { stage } => {
                tracing::info!(%stage, "asset cleanup cancelled");
                Err(CleanupError::Canceled)
            }
            PipelineOutcome::Failed { stage, error } => {
                let err = typed.unwrap_or(CleanupError::Stage {
                    stage,
                    source: error,
                });
                tracing::warn!(error = %err, label = err.as_label(), "asset cleanup failed");
                Err(err)
            }
        }
    }

    fn collect_files_stage(&self, state: &Arc<RunState>) -> TaskSpec {
        let state = Arc::clone(state);
        let roots = vec![self.cfg.libraries_dir.clone(), self.cfg.assets_dir.clone()];
        TaskSpec::builder(STAGE_COLLECT_FILES).build(move |handle: TaskHandle| {
            let state = Arc::clone(&state);
            let roots = roots.clone();
            async move {
                handle.update_progress(INDETERMINATE);
                let files = collect_files(roots, handle.token())
                    .await
                    .map_err(|e| state.fail(e))?;
                handle.update_message("found {0} installed files", [files.len().to_string()]);
                *lock(&state.installed) = files;
                Ok(())
            }
        })
    }

    fn collect_game_files_stage(&self, state: &Arc<RunState>) -> TaskSpec {
        let state = Arc::clone(state);
        let catalog = Arc::clone(&self.catalog);
        TaskSpec::builder(STAGE_COLLECT_GAME_FILES).build(move |handle: TaskHandle| {
            let state = Arc::clone(&state);
            let catalog = Arc::clone(&catalog);
            async move {
                handle.update_progress(INDETERMINATE);
                let versions = catalog
                    .versions()
                    .await
                    .map_err(|e| state.fail(e.into()))?;

                for version in versions {
                    handle.ensure_active()?;
                    handle.update_message("collecting files of {0}", [version.as_str()]);
                    let files = catalog
                        .required_files(&version)
                        .await
                        .map_err(|e| state.fail(e.into()))?;
                    let keys = canonical_keys(files).await.map_err(|e| state.fail(e))?;

                    let mut required = lock(&state.required);
                    let before = required.len();
                    required.extend(keys);
                    tracing::debug!(%version, added = required.len() - before, "required files collected");
                }
                Ok(())
            }
        })
    }
}

fn compare_files_stage(state: &Arc<RunState>) -> TaskSpec {
    let state = Arc::clone(state);
    TaskSpec::builder(STAGE_COMPARE_FILES).build(move |handle: TaskHandle| {
        let state = Arc::clone(&state);
        async move {
            handle.update_progress(INDETERMINATE);
            let candidates: Vec<PathBuf> = {
                let installed = lock(&state.installed);
                let required = lock(&state.required);
                installed
                    .iter()
                    .filter(|p| !required.contains(*p))
                    .cloned()
                    .collect()
            };

            let mut redundant = Vec::with_capacity(candidates.len());
            for path in candidates {
                handle.ensure_active()?;
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    redundant.push(path);
                }
            }
            redundant.sort();
            handle.update_message("{0} redundant files", [redundant.len().to_string()]);
            *lock(&state.redundant) = redundant;
            Ok(())
        }
    })
}

fn cleanup_stage(state: &Arc<RunState>) -> TaskSpec {
    let state = Arc::clone(state);
    TaskSpec::builder(STAGE_CLEANUP).build(move |handle: TaskHandle| {
        let state = Arc::clone(&state);
        async move {
            let files = std::mem::take(&mut *lock(&state.redundant));
            let total = files.len();
            let mut failed = Vec::new();

            for (index, file) in files.into_iter().enumerate() {
                handle.ensure_active()?;
                let size = tokio::fs::metadata(&file).await.map(|m| m.len()).unwrap_or(0);
                match tokio::fs::remove_file(&file).await {
                    Ok(()) => {
                        let mut report = lock(&state.report);
                        report.deleted += 1;
                        report.reclaimed_bytes += size;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(file = %file.display(), error = %e, "failed to delete file");
                        failed.push(file.clone());
                    }
                }
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                handle.update_progress_with(index as f32 / total as f32, "{0}", [name]);
            }
            handle.update_progress(INDETERMINATE);

            if failed.is_empty() {
                Ok(())
            } else {
                Err(state.fail(CleanupError::PartialDeletion { files: failed }))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use async_trait::async_trait;

    use super::*;
    use crate::cleanup::error::CatalogError;
    use crate::core::SystemConfig;

    struct StaticCatalog {
        versions: BTreeMap<String, Vec<PathBuf>>,
    }

    #[async_trait]
    impl VersionCatalog for StaticCatalog {
        async fn versions(&self) -> Result<Vec<String>, CatalogError> {
            Ok(self.versions.keys().cloned().collect())
        }

        async fn required_files(&self, version: &str) -> Result<Vec<PathBuf>, CatalogError> {
            self.versions
                .get(version)
                .cloned()
                .ok_or_else(|| CatalogError::new(format!("unknown version {version}")))
        }
    }

    struct BrokenCatalog;

    #[async_trait]
    impl VersionCatalog for BrokenCatalog {
        async fn versions(&self) -> Result<Vec<String>, CatalogError> {
            Ok(vec!["1.20.1".into()])
        }

        async fn required_files(&self, _version: &str) -> Result<Vec<PathBuf>, CatalogError> {
            Err(CatalogError::new("manifest missing"))
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(dir.path().join("libraries")).unwrap();
            std::fs::create_dir_all(dir.path().join("assets/objects/ab")).unwrap();
            Self { dir }
        }

        fn file(&self, rel: &str, len: usize) -> PathBuf {
            let path = self.dir.path().join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, vec![0u8; len]).unwrap();
            path
        }

        fn cfg(&self) -> CleanerConfig {
            CleanerConfig {
                libraries_dir: self.dir.path().join("libraries"),
                assets_dir: self.dir.path().join("assets"),
            }
        }

        fn cleaner(&self, versions: &[(&str, Vec<PathBuf>)]) -> AssetCleaner {
            let catalog = StaticCatalog {
                versions: versions
                    .iter()
                    .map(|(v, files)| ((*v).to_owned(), files.clone()))
                    .collect(),
            };
            AssetCleaner::new(self.cfg(), Arc::new(catalog))
        }
    }

    fn system() -> Arc<TaskSystem> {
        TaskSystem::builder(SystemConfig::default()).build()
    }

    fn exists(p: &Path) -> bool {
        p.exists()
    }

    #[tokio::test]
    async fn deletes_only_unreachable_files() {
        let fx = Fixture::new();
        let needed = fx.file("libraries/org/a/a-1.0.jar", 10);
        let asset = fx.file("assets/objects/ab/abcdef", 20);
        let stale = fx.file("libraries/org/old/old-0.1.jar", 100);
        let stale_asset = fx.file("assets/objects/ab/ab0000", 28);

        let cleaner = fx.cleaner(&[("1.20.1", vec![needed.clone(), asset.clone()])]);
        let report = cleaner.cleanup(&system(), &CancellationToken::new()).await.unwrap();

        assert_eq!(report, CleanupReport { deleted: 2, reclaimed_bytes: 128 });
        assert_eq!(report.reclaimed(), "128.00 B");
        assert!(exists(&needed) && exists(&asset));
        assert!(!exists(&stale) && !exists(&stale_asset));
    }

    #[tokio::test]
    async fn files_needed_by_any_version_survive() {
        let fx = Fixture::new();
        let shared = fx.file("libraries/shared.jar", 1);
        let only_old = fx.file("libraries/legacy.jar", 1);
        let only_new = fx.file("libraries/modern.jar", 1);

        let cleaner = fx.cleaner(&[
            ("1.7.10", vec![shared.clone(), only_old.clone()]),
            ("1.21", vec![shared.clone(), only_new.clone()]),
        ]);
        let report = cleaner.cleanup(&system(), &CancellationToken::new()).await.unwrap();

        assert_eq!(report.deleted, 0);
        assert!(exists(&shared) && exists(&only_old) && exists(&only_new));
    }

    #[tokio::test]
    async fn second_run_deletes_nothing() {
        let fx = Fixture::new();
        let needed = fx.file("libraries/a.jar", 4);
        fx.file("libraries/b.jar", 4);
        fx.file("assets/objects/ab/zz", 4);

        let cleaner = fx.cleaner(&[("1.20.1", vec![needed])]);
        let sys = system();
        let first = cleaner.cleanup(&sys, &CancellationToken::new()).await.unwrap();
        let second = cleaner.cleanup(&sys, &CancellationToken::new()).await.unwrap();

        assert_eq!(first.deleted, 2);
        assert_eq!(second, CleanupReport::default());
    }

    #[tokio::test]
    async fn catalog_failure_deletes_nothing() {
        let fx = Fixture::new();
        let stale = fx.file("libraries/stale.jar", 4);
        let cleaner = AssetCleaner::new(fx.cfg(), Arc::new(BrokenCatalog));

        let err = cleaner.cleanup(&system(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CleanupError::Catalog(_)));
        assert!(exists(&stale));
    }

    #[tokio::test]
    async fn cancelled_run_deletes_nothing() {
        let fx = Fixture::new();
        let stale = fx.file("libraries/stale.jar", 4);
        let cleaner = fx.cleaner(&[]);
        let token = CancellationToken::new();
        token.cancel();

        let err = cleaner.cleanup(&system(), &token).await.unwrap_err();
        assert!(matches!(err, CleanupError::Canceled));
        assert!(exists(&stale));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn undeletable_files_are_reported_and_others_stay_deleted() {
        use std::os::unix::fs::PermissionsExt;

        let fx = Fixture::new();
        let locked_dir = fx.dir.path().join("libraries/locked");
        let locked = fx.file("libraries/locked/pinned.jar", 4);
        let stale = fx.file("libraries/stale.jar", 4);
        std::fs::set_permissions(&locked_dir, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores directory permissions.
        let marker = locked_dir.join(".marker");
        if std::fs::write(&marker, b"").is_ok() {
            let _ = std::fs::remove_file(&marker);
            std::fs::set_permissions(&locked_dir, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let cleaner = fx.cleaner(&[]);
        let err = cleaner.cleanup(&system(), &CancellationToken::new()).await.unwrap_err();
        std::fs::set_permissions(&locked_dir, std::fs::Permissions::from_mode(0o755)).unwrap();

        match err {
            CleanupError::PartialDeletion { files } => {
                assert_eq!(files, vec![canonical_key_of(&locked)]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!exists(&stale));
        assert!(exists(&locked));
    }

    fn canonical_key_of(p: &Path) -> PathBuf {
        crate::cleanup::files::canonical_key(p)
    }
}
