//! Error types for the directory watcher.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the directory watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Watch target did not exist at registration.
    #[error("watch target unavailable: {}", .0.display())]
    WatchUnavailable(PathBuf),

    /// No tokio runtime to arm debounce timers on.
    #[error("debouncer must be created inside a tokio runtime")]
    NoRuntime,

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
