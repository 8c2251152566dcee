//! Source tree scanning.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, ScanError};
use crate::exclude::ExcludePolicy;
use crate::tracked::{FileStatus, TrackedFile};

/// What a scan keeps and where its outputs go.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Allowed source extensions, with or without a leading dot.
    pub source_extensions: Vec<String>,

    /// Extension swapped in to derive the output path.
    pub target_extension: String,

    /// Sources matching this policy are skipped.
    pub exclude: ExcludePolicy,

    /// Drop the relative directory when deriving outputs.
    pub flatten: bool,
}

impl ScanOptions {
    /// Create options for the given source extensions and output extension.
    pub fn new<I, S>(source_extensions: I, target_extension: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_extensions: source_extensions.into_iter().map(Into::into).collect(),
            target_extension: target_extension.into(),
            exclude: ExcludePolicy::none(),
            flatten: false,
        }
    }

    /// Set the exclude policy.
    pub fn with_exclude(mut self, exclude: ExcludePolicy) -> Self {
        self.exclude = exclude;
        self
    }

    /// Flatten outputs into the target root.
    pub fn flattened(mut self) -> Self {
        self.flatten = true;
        self
    }

    fn accepts_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(std::ffi::OsStr::to_str) else {
            return false;
        };
        self.source_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// Counts per status, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub new: usize,
    pub modified: usize,
    pub unchanged: usize,
}

impl ScanSummary {
    /// Tally a set of tracked files.
    pub fn of(files: &[TrackedFile]) -> Self {
        let mut summary = Self::default();
        for file in files {
            match file.status {
                FileStatus::New => summary.new += 1,
                FileStatus::Modified => summary.modified += 1,
                FileStatus::Unchanged => summary.unchanged += 1,
                FileStatus::Unknown => {}
            }
        }
        summary
    }
}

/// Scan `source_root` and classify every candidate against `target_root`.
///
/// Read-only. Results are ordered by relative path, so two scans of an
/// unchanged tree compare equal.
pub fn scan(
    source_root: &Path,
    target_root: &Path,
    options: &ScanOptions,
) -> Result<Vec<TrackedFile>> {
    if !source_root.exists() {
        return Err(ScanError::NotFound(source_root.to_path_buf()));
    }
    if !source_root.is_dir() {
        return Err(ScanError::NotADirectory(source_root.to_path_buf()));
    }

    let mut relative_paths: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(source_root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Usually a file removed mid-walk or an unreadable directory.
                warn!(
                    "Skipping unreadable entry under {}: {e}",
                    source_root.display()
                );
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !options.accepts_extension(path) {
            continue;
        }

        let Ok(relative) = path.strip_prefix(source_root) else {
            continue;
        };

        if options.exclude.is_excluded(relative) {
            debug!("Excluded from scan: {}", relative.display());
            continue;
        }

        relative_paths.push(relative.to_path_buf());
    }

    relative_paths.sort();

    let files: Vec<TrackedFile> = relative_paths
        .into_iter()
        .map(|relative| {
            TrackedFile::new(
                source_root,
                target_root,
                relative,
                &options.target_extension,
                options.flatten,
            )
        })
        .map(TrackedFile::with_timestamps)
        .inspect(|file| {
            if file.last_modified == 0 {
                debug!("Source vanished during scan: {}", file.source.display());
            }
        })
        .collect();

    let summary = ScanSummary::of(&files);
    info!(
        "Scanned {} ({} files: new {}, modified {}, unchanged {})",
        source_root.display(),
        files.len(),
        summary.new,
        summary.modified,
        summary.unchanged
    );

    Ok(files)
}
