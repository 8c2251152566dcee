//! Live rebuilds driven by debounced file changes.

use std::sync::Arc;

use quire_collector::Collector;
use quire_directory_watcher::{DebounceConfig, Debouncer, FileEvent};
use tracing::{error, info};

use crate::config::BuildConfig;
use crate::error::Result;
use crate::pass::{Format, PassReport, run_for_change};
use crate::transformer::Transformer;

/// Called with the outcome of every live rebuild.
pub type ReportCallback = Arc<dyn Fn(PassReport) + Send + Sync>;

/// Watches every configured format's sources and rebuilds on change.
///
/// Each settled change runs one self-contained pass on the blocking pool,
/// so a slow transformer only delays that change.
pub struct LiveBuild {
    debouncers: Vec<Debouncer>,
}

impl LiveBuild {
    /// Start watching. Must be called inside a tokio runtime.
    pub fn start(config: &BuildConfig, transformer: Arc<dyn Transformer>) -> Result<Self> {
        Self::start_with_reports(config, transformer, Arc::new(|_report: PassReport| {}))
    }

    /// Start watching, handing each pass report to `on_report`.
    pub fn start_with_reports(
        config: &BuildConfig,
        transformer: Arc<dyn Transformer>,
        on_report: ReportCallback,
    ) -> Result<Self> {
        let collector = Arc::new(Collector::new(config.collector()));
        let mut debouncers = Vec::with_capacity(config.formats.len());

        for format_config in &config.formats {
            let format = Arc::new(Format::from_config(format_config, config.default_match_kinds));
            let watch = DebounceConfig::root(&format.source_root)
                .with_quiet_window(config.quiet_window());

            let transformer = Arc::clone(&transformer);
            let collector = Arc::clone(&collector);
            let on_report = Arc::clone(&on_report);
            let debouncer = Debouncer::new(watch, move |event: FileEvent| {
                let format = Arc::clone(&format);
                let transformer = Arc::clone(&transformer);
                let collector = Arc::clone(&collector);
                let on_report = Arc::clone(&on_report);
                tokio::task::spawn_blocking(move || {
                    match run_for_change(
                        &format,
                        transformer.as_ref(),
                        &collector,
                        &event.relative_path,
                    ) {
                        Ok(report) => on_report(report),
                        Err(e) => error!(
                            "Live rebuild of {} failed: {e}",
                            event.path().display()
                        ),
                    }
                });
            })?;

            debouncers.push(debouncer);
        }

        info!("Live build watching {} format(s)", debouncers.len());
        Ok(Self { debouncers })
    }

    /// Number of formats being watched.
    pub fn formats(&self) -> usize {
        self.debouncers.len()
    }

    /// Stop every watcher. A rebuild already settling may still run once.
    pub fn stop(&mut self) {
        for debouncer in &mut self.debouncers {
            debouncer.stop();
        }
        self.debouncers.clear();
    }
}
