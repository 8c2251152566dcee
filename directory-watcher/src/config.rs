//! Configuration types for debounced watching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Quiet window used when none is configured.
pub const DEFAULT_QUIET_WINDOW_MS: u64 = 2_000;

/// Configuration for one debounced watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Root the watched path and reported paths are relative to.
    pub root: PathBuf,

    /// File or directory to watch, relative to `root`. Empty watches `root`.
    pub relative_path: PathBuf,

    /// Minimum spacing between notifications for them to count as
    /// separate changes, in milliseconds.
    pub quiet_window_ms: u64,
}

impl DebounceConfig {
    /// Create a config watching `relative_path` under `root`.
    pub fn new(root: impl Into<PathBuf>, relative_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            relative_path: relative_path.into(),
            quiet_window_ms: DEFAULT_QUIET_WINDOW_MS,
        }
    }

    /// Watch the whole root.
    pub fn root(root: impl Into<PathBuf>) -> Self {
        Self::new(root, PathBuf::new())
    }

    /// Set the quiet window.
    pub fn with_quiet_window(mut self, window: Duration) -> Self {
        self.quiet_window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The quiet window as a duration.
    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }

    /// Absolute path of the watch target.
    pub fn target(&self) -> PathBuf {
        if self.relative_path.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(&self.relative_path)
        }
    }

    /// `path` relative to the root, if it lies under it.
    pub fn relativize<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }
}
