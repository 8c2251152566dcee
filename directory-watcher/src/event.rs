//! File events from debounced watching.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A debounced "this file changed" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    /// The raw kind that opened the quiet window.
    pub kind: FileEventKind,

    /// Watch root.
    pub root: PathBuf,

    /// Changed file, relative to `root`.
    pub relative_path: PathBuf,

    /// When the quiet window closed.
    pub timestamp: DateTime<Utc>,
}

impl FileEvent {
    /// Create a new file event stamped now.
    pub fn new(
        kind: FileEventKind,
        root: impl Into<PathBuf>,
        relative_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind,
            root: root.into(),
            relative_path: relative_path.into(),
            timestamp: Utc::now(),
        }
    }

    /// Absolute path of the changed file.
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.relative_path)
    }
}

/// Kind of raw notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    /// File was created.
    Created,

    /// File contents were modified.
    Modified,

    /// File was deleted.
    Deleted,

    /// File was renamed, either side.
    Renamed,

    /// File metadata changed.
    MetadataChanged,

    /// File was read or opened.
    Accessed,

    /// Unknown event type.
    Unknown,
}

impl FileEventKind {
    /// Notifications that never indicate a content change.
    pub fn is_noise(self) -> bool {
        matches!(self, Self::Accessed)
    }
}

impl From<notify::EventKind> for FileEventKind {
    fn from(kind: notify::EventKind) -> Self {
        match kind {
            notify::EventKind::Create(_) => Self::Created,
            notify::EventKind::Modify(modify_kind) => match modify_kind {
                notify::event::ModifyKind::Name(_) => Self::Renamed,
                notify::event::ModifyKind::Metadata(_) => Self::MetadataChanged,
                _ => Self::Modified,
            },
            notify::EventKind::Remove(_) => Self::Deleted,
            notify::EventKind::Access(_) => Self::Accessed,
            _ => Self::Unknown,
        }
    }
}
