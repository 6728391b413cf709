//! # Removal of library and asset files no installed version needs.
//!
//! - [`AssetCleaner`] the four-stage GC pipeline.
//! - [`VersionCatalog`] installed versions and their required files.
//! - [`format_size`] human-readable byte counts for reports.

mod catalog;
mod cleaner;
mod error;
mod files;

pub use catalog::VersionCatalog;
pub use cleaner::{
    AssetCleaner, CleanerConfig, CleanupReport, STAGE_CLEANUP, STAGE_COLLECT_FILES,
    STAGE_COLLECT_GAME_FILES, STAGE_COMPARE_FILES,
};
pub use error::{CatalogError, CleanupError};
pub use files::{canonical_key, format_size};
