//! Collector configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where evicted artifacts go and how related files are recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Root of the quarantine tree.
    pub quarantine_dir: PathBuf,

    /// Stem suffix marking a derivative of a primary artifact,
    /// e.g. `page.stripped.html` next to `page.html`.
    pub sibling_suffix: String,

    /// Suffix appended to an artifact's full name to find its source map.
    pub source_map_suffix: String,
}

impl CollectorConfig {
    /// Create a config quarantining into `quarantine_dir`.
    pub fn new(quarantine_dir: impl Into<PathBuf>) -> Self {
        Self {
            quarantine_dir: quarantine_dir.into(),
            ..Self::default()
        }
    }

    /// Set the derivative sibling suffix.
    pub fn with_sibling_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.sibling_suffix = suffix.into();
        self
    }

    /// Set the source map suffix.
    pub fn with_source_map_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.source_map_suffix = suffix.into();
        self
    }

    /// Default quarantine location under the system temp directory.
    pub fn default_quarantine_dir() -> PathBuf {
        std::env::temp_dir().join("quire-quarantine")
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            quarantine_dir: Self::default_quarantine_dir(),
            sibling_suffix: ".stripped".to_string(),
            source_map_suffix: ".map".to_string(),
        }
    }
}
