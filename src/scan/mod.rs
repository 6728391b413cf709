//! # Concurrent scanning of large item sets.
//!
//! - [`scan_all`] bounded worker pool over a closed work queue.
//! - [`scan_directory`] the pool applied to the files of one directory, sorted by name.

mod directory;
mod pool;

pub use directory::scan_directory;
pub use pool::{DEFAULT_PARALLELISM, ScanFailure, Scanned, scan_all};
