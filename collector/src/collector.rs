//! Obsolete artifact collection.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use quire_changeset::ExcludePolicy;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::CollectorConfig;
use crate::error::{CollectError, Result};
use crate::quarantine::{QuarantineAction, quarantine};

/// Outcome of one collection pass.
#[derive(Debug, Default)]
pub struct CollectReport {
    /// Artifacts moved into quarantine.
    pub actions: Vec<QuarantineAction>,

    /// Artifacts that should have moved but could not.
    pub failures: Vec<CollectError>,
}

impl CollectReport {
    /// Number of artifacts evicted. For logging, not control flow.
    pub fn evicted(&self) -> usize {
        self.actions.len()
    }
}

/// Moves generated artifacts with no surviving source into quarantine.
pub struct Collector {
    config: CollectorConfig,
}

impl Collector {
    /// Create a collector.
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// The collector's configuration.
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Evict every `governed_extension` file under `output_root` that is not
    /// kept, not excluded, and not a derivative sibling of a kept file.
    ///
    /// `keep` entries may be absolute paths under `output_root` or paths
    /// relative to it. Individual move failures are logged and reported;
    /// only a missing `output_root` fails the call.
    pub fn collect<I, P>(
        &self,
        governed_extension: &str,
        output_root: &Path,
        keep: I,
        exclude: &ExcludePolicy,
    ) -> Result<CollectReport>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        if !output_root.is_dir() {
            return Err(CollectError::NotFound(output_root.to_path_buf()));
        }

        let governed = governed_extension.trim_start_matches('.');
        let keep: HashSet<PathBuf> = keep
            .into_iter()
            .map(|p| relative_to(output_root, p.as_ref()))
            .collect();

        let quarantine_dir = &self.config.quarantine_dir;
        let candidates: Vec<PathBuf> = WalkDir::new(output_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.path() != quarantine_dir.as_path())
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(
                        "Skipping unreadable entry under {}: {e}",
                        output_root.display()
                    );
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(governed))
            })
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(output_root)
                    .ok()
                    .map(Path::to_path_buf)
            })
            .collect();

        let mut report = CollectReport::default();

        for relative in candidates {
            if keep.contains(&relative) {
                continue;
            }
            if exclude.is_excluded(&relative) {
                debug!("Excluded from collection: {}", relative.display());
                continue;
            }
            if self.is_kept_sibling(&relative, &keep) {
                debug!("Keeping derivative sibling: {}", relative.display());
                continue;
            }

            match quarantine(
                output_root,
                quarantine_dir,
                &relative,
                &self.config.source_map_suffix,
            ) {
                Ok(action) => report.actions.push(action),
                Err(e) => {
                    warn!("{e}");
                    report.failures.push(e);
                }
            }
        }

        if report.evicted() > 0 || !report.failures.is_empty() {
            info!(
                "Collected {} obsolete .{governed} artifact(s) from {} ({} failed)",
                report.evicted(),
                output_root.display(),
                report.failures.len()
            );
        }

        Ok(report)
    }

    /// `page.stripped.html` is a sibling of a kept `page.html`.
    fn is_kept_sibling(&self, relative: &Path, keep: &HashSet<PathBuf>) -> bool {
        let suffix = self.config.sibling_suffix.as_str();
        if suffix.is_empty() {
            return false;
        }

        let Some(stem) = relative.file_stem().and_then(std::ffi::OsStr::to_str) else {
            return false;
        };
        let Some(primary_stem) = stem.strip_suffix(suffix) else {
            return false;
        };

        let mut primary = relative.with_file_name(primary_stem);
        if let Some(ext) = relative.extension() {
            primary.set_extension(ext);
        }

        keep.contains(&primary)
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(CollectorConfig::default())
    }
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
