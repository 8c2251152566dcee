//! # Build
//!
//! Incremental build passes over a site's source formats.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Build                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  BuildConfig ──► Format ──► run_pass ──► PassReport             │
//! │                               │                                 │
//! │          scan ─► is_stale ─► Transformer ─► Collector           │
//! │                                                                 │
//! │  LiveBuild: Debouncer ──► run_for_change (one file at a time)   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod live;
pub mod pass;
pub mod transformer;

pub use config::{BuildConfig, FormatConfig};
pub use error::{BuildError, Result};
pub use live::{LiveBuild, ReportCallback};
pub use pass::{Format, PassReport, run_for_change, run_pass};
pub use transformer::{CopyTransformer, Transformer};

use quire_collector::Collector;

/// Run a full pass over every configured format, in order.
///
/// A missing source root aborts the build; everything else is reported per
/// pass.
pub fn build_all(config: &BuildConfig, transformer: &dyn Transformer) -> Result<Vec<PassReport>> {
    let collector = Collector::new(config.collector());
    config
        .formats
        .iter()
        .map(|f| Format::from_config(f, config.default_match_kinds))
        .map(|format| run_pass(&format, transformer, &collector))
        .collect()
}
