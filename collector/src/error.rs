//! Error types for artifact collection.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, CollectError>;

/// Errors that can occur while collecting obsolete artifacts.
#[derive(Error, Debug)]
pub enum CollectError {
    /// The output root does not exist.
    #[error("output root not found: {}", .0.display())]
    NotFound(PathBuf),

    /// One artifact could not be moved into quarantine.
    #[error("failed to quarantine {}: {source}", .path.display())]
    EvictionFailure {
        path: PathBuf,
        source: std::io::Error,
    },
}
