//! Tracked source files and their derived outputs.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

/// Classification of a source against its derived output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Timestamps have not been read yet.
    #[default]
    Unknown,

    /// Output exists and is at least as new as the source.
    Unchanged,

    /// Output does not exist.
    New,

    /// Source is strictly newer than its output.
    Modified,
}

impl FileStatus {
    /// Derive a status from the two modification times (0 = absent).
    pub fn classify(last_modified: u64, target_last_modified: u64) -> Self {
        if target_last_modified == 0 {
            Self::New
        } else if last_modified > target_last_modified {
            Self::Modified
        } else {
            Self::Unchanged
        }
    }
}

/// One source artifact under a scan root, paired with its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    /// Full path to the source file.
    pub source: PathBuf,

    /// Source path relative to the scan root.
    pub relative_path: PathBuf,

    /// Source extension, without the leading dot.
    pub source_ext: String,

    /// Source modification time in milliseconds since the epoch, 0 if absent.
    pub last_modified: u64,

    /// Full path to the derived output.
    pub target: PathBuf,

    /// Directory the output lives in.
    pub target_dir: PathBuf,

    /// Output modification time in milliseconds since the epoch, 0 if absent.
    pub target_last_modified: u64,

    /// Classification of the pair.
    pub status: FileStatus,
}

impl TrackedFile {
    /// First setup phase: derive the output path from the source path.
    ///
    /// The output keeps the source's relative directory under `target_root`
    /// unless `flatten` is set, in which case only the file name is kept.
    pub fn new(
        source_root: &Path,
        target_root: &Path,
        relative_path: impl Into<PathBuf>,
        target_ext: &str,
        flatten: bool,
    ) -> Self {
        let relative_path = relative_path.into();
        let source_ext = relative_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut target_rel = if flatten {
            relative_path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| relative_path.clone())
        } else {
            relative_path.clone()
        };
        target_rel.set_extension(target_ext.trim_start_matches('.'));

        let target = target_root.join(&target_rel);
        let target_dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| target_root.to_path_buf());

        Self {
            source: source_root.join(&relative_path),
            relative_path,
            source_ext,
            last_modified: 0,
            target,
            target_dir,
            target_last_modified: 0,
            status: FileStatus::Unknown,
        }
    }

    /// Second setup phase: read both timestamps from disk and classify.
    pub fn with_timestamps(mut self) -> Self {
        self.last_modified = modified_millis(&self.source);
        self.target_last_modified = modified_millis(&self.target);
        self.status = FileStatus::classify(self.last_modified, self.target_last_modified);
        self
    }

    /// Whether the scanner alone already marks this file for rebuilding.
    pub fn needs_build(&self) -> bool {
        matches!(self.status, FileStatus::New | FileStatus::Modified)
    }
}

/// Modification time of `path` in milliseconds since the epoch.
///
/// Missing or unreadable paths report 0.
pub fn modified_millis(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify() {
        assert_eq!(FileStatus::classify(10, 0), FileStatus::New);
        assert_eq!(FileStatus::classify(0, 0), FileStatus::New);
        assert_eq!(FileStatus::classify(20, 10), FileStatus::Modified);
        assert_eq!(FileStatus::classify(10, 10), FileStatus::Unchanged);
        assert_eq!(FileStatus::classify(5, 10), FileStatus::Unchanged);
    }

    #[test]
    fn test_target_preserves_directory() {
        let file = TrackedFile::new(
            Path::new("/site/styles"),
            Path::new("/site/public/css"),
            "themes/dark.scss",
            "css",
            false,
        );

        assert_eq!(file.source, Path::new("/site/styles/themes/dark.scss"));
        assert_eq!(file.target, Path::new("/site/public/css/themes/dark.css"));
        assert_eq!(file.target_dir, Path::new("/site/public/css/themes"));
        assert_eq!(file.source_ext, "scss");
        assert_eq!(file.status, FileStatus::Unknown);
    }

    #[test]
    fn test_target_flattened() {
        let file = TrackedFile::new(
            Path::new("/site/scripts"),
            Path::new("/site/public/js"),
            "widgets/menu.ts",
            ".js",
            true,
        );

        assert_eq!(file.target, Path::new("/site/public/js/menu.js"));
        assert_eq!(file.target_dir, Path::new("/site/public/js"));
    }

    #[test]
    fn test_missing_paths_report_zero() {
        assert_eq!(modified_millis(Path::new("/nonexistent/quire/12345")), 0);
    }
}
