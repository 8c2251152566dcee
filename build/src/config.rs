//! Build configuration.
//!
//! Loaded from TOML. Relative directories are resolved against the
//! directory holding the configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use quire_changeset::{ExcludePolicy, ExcludeSpec, MatchKinds, ScanOptions};
use quire_collector::CollectorConfig;
use quire_directory_watcher::DEFAULT_QUIET_WINDOW_MS;
use quire_invalidation::ReferenceExtractor;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

/// Configuration for every format a site builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Root of the quarantine tree for evicted artifacts.
    #[serde(default = "CollectorConfig::default_quarantine_dir")]
    pub quarantine_dir: PathBuf,

    /// Quiet window for live rebuilds, in milliseconds.
    #[serde(default = "default_quiet_window_ms")]
    pub quiet_window_ms: u64,

    /// Match kinds applied to flat exclude lists.
    #[serde(default)]
    pub default_match_kinds: MatchKinds,

    /// One entry per source format.
    #[serde(default, rename = "format")]
    pub formats: Vec<FormatConfig>,
}

fn default_quiet_window_ms() -> u64 {
    DEFAULT_QUIET_WINDOW_MS
}

impl BuildConfig {
    /// Create an empty configuration with defaults.
    pub fn new() -> Self {
        Self {
            quarantine_dir: CollectorConfig::default_quarantine_dir(),
            quiet_window_ms: DEFAULT_QUIET_WINDOW_MS,
            default_match_kinds: MatchKinds::default(),
            formats: Vec::new(),
        }
    }

    /// Add a format.
    pub fn with_format(mut self, format: FormatConfig) -> Self {
        self.formats.push(format);
        self
    }

    /// Set the quarantine directory.
    pub fn with_quarantine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.quarantine_dir = dir.into();
        self
    }

    /// Set the live-rebuild quiet window.
    pub fn with_quiet_window(mut self, window: Duration) -> Self {
        self.quiet_window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Parse TOML, resolving relative directories against `base_dir`.
    pub fn from_toml_str(contents: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(contents)?;
        config.resolve_paths(base_dir);
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| BuildError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&contents, base_dir)
    }

    /// Find a format by name.
    pub fn format(&self, name: &str) -> Result<&FormatConfig> {
        self.formats
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| BuildError::UnknownFormat(name.to_string()))
    }

    /// The live-rebuild quiet window.
    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }

    /// Collector settings derived from this configuration.
    pub fn collector(&self) -> CollectorConfig {
        CollectorConfig::new(&self.quarantine_dir)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        self.quarantine_dir = base_dir.join(&self.quarantine_dir);
        for format in &mut self.formats {
            format.source_dir = base_dir.join(&format.source_dir);
            format.output_dir = base_dir.join(&format.output_dir);
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One source format: where it lives, where it goes, how it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Name used in logs and reports.
    pub name: String,

    /// Scan root for sources.
    pub source_dir: PathBuf,

    /// Root of the generated outputs.
    pub output_dir: PathBuf,

    /// Source extensions to build.
    pub source_extensions: Vec<String>,

    /// Extension of the generated outputs.
    pub target_extension: String,

    /// Sources to skip (partials, drafts).
    #[serde(default)]
    pub exclude: ExcludeSpec,

    /// Outputs the collector must never evict.
    #[serde(default)]
    pub output_exclude: ExcludeSpec,

    /// Write every output directly under `output_dir`.
    #[serde(default)]
    pub flatten: bool,

    /// Reference extractor; formats without one only rebuild on their own
    /// changes.
    #[serde(default)]
    pub references: Option<ReferenceExtractor>,

    /// Whether obsolete outputs are collected after each pass.
    #[serde(default = "default_collect")]
    pub collect: bool,
}

fn default_collect() -> bool {
    true
}

impl FormatConfig {
    /// Create a format with no excludes and no reference extractor.
    pub fn new<I, S>(
        name: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        source_extensions: I,
        target_extension: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            source_extensions: source_extensions.into_iter().map(Into::into).collect(),
            target_extension: target_extension.into(),
            exclude: ExcludeSpec::default(),
            output_exclude: ExcludeSpec::default(),
            flatten: false,
            references: None,
            collect: true,
        }
    }

    /// Set the source exclude spec.
    pub fn with_exclude(mut self, exclude: ExcludeSpec) -> Self {
        self.exclude = exclude;
        self
    }

    /// Set the output exclude spec.
    pub fn with_output_exclude(mut self, exclude: ExcludeSpec) -> Self {
        self.output_exclude = exclude;
        self
    }

    /// Set the reference extractor.
    pub fn with_references(mut self, extractor: impl Into<ReferenceExtractor>) -> Self {
        self.references = Some(extractor.into());
        self
    }

    /// Flatten outputs.
    pub fn flattened(mut self) -> Self {
        self.flatten = true;
        self
    }

    /// Disable collection of obsolete outputs.
    pub fn without_collection(mut self) -> Self {
        self.collect = false;
        self
    }

    /// Scanner options for this format.
    pub fn scan_options(&self, kinds: MatchKinds) -> ScanOptions {
        let options = ScanOptions::new(
            self.source_extensions.iter().cloned(),
            &self.target_extension,
        )
        .with_exclude(ExcludePolicy::from_spec(&self.exclude, kinds));
        if self.flatten {
            options.flattened()
        } else {
            options
        }
    }

    /// Collector exclude policy for this format.
    pub fn output_exclude_policy(&self, kinds: MatchKinds) -> ExcludePolicy {
        ExcludePolicy::from_spec(&self.output_exclude, kinds)
    }
}
