//! Error types for reference tracking.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for invalidation operations.
pub type Result<T> = std::result::Result<T, InvalidationError>;

/// A declared reference that resolves to no file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dangling reference \"{reference}\" in {}", .from.display())]
pub struct DanglingReference {
    /// File containing the directive, relative to the scan root.
    pub from: PathBuf,

    /// The name as written in the directive.
    pub reference: String,
}

/// Errors that can occur while building a reference graph.
#[derive(Error, Debug)]
pub enum InvalidationError {
    /// Reference resolved nowhere.
    #[error(transparent)]
    Dangling(#[from] DanglingReference),

    /// A file could not be read for reference extraction.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}
