//! Error types for build passes.

use std::path::PathBuf;

use quire_changeset::ScanError;
use quire_collector::CollectError;
use quire_directory_watcher::WatcherError;
use thiserror::Error;

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that abort a build pass.
///
/// Failures local to one file (a transformer error, a failed eviction, a
/// dangling reference) are recorded in the pass report instead.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Configuration file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration file is not valid.
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// No format with the given name is configured.
    #[error("unknown format: {0}")]
    UnknownFormat(String),

    /// Scan failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Collection failed.
    #[error(transparent)]
    Collect(#[from] CollectError),

    /// Watcher failed.
    #[error(transparent)]
    Watch(#[from] WatcherError),
}
