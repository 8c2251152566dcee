//! Error types for source scanning.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that can occur while scanning a source tree.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The scan root does not exist.
    #[error("source root not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The scan root exists but is not a directory.
    #[error("source root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
