use std::path::PathBuf;

use async_trait::async_trait;

use crate::cleanup::error::CatalogError;

/// Source of installed versions and the files each one needs at launch.
///
/// Manifest interpretation (libraries, asset index) lives behind this trait.
#[async_trait]
pub trait VersionCatalog: Send + Sync + 'static {
    /// Names of all installed versions.
    async fn versions(&self) -> Result<Vec<String>, CatalogError>;

    /// Library and asset files required by `version`.
    async fn required_files(&self, version: &str) -> Result<Vec<PathBuf>, CatalogError>;
}
