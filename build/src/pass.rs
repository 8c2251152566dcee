//! One incremental build pass over a format.
//!
//! ```text
//! scan ──► is_stale ──► transform + write ──► collect
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use quire_changeset::{ExcludePolicy, MatchKinds, ScanOptions, TrackedFile, scan};
use quire_collector::Collector;
use quire_invalidation::{ReferenceExtractor, ReferenceGraph, is_stale};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::FormatConfig;
use crate::error::Result;
use crate::transformer::Transformer;

/// A format resolved for running passes.
#[derive(Debug, Clone)]
pub struct Format {
    pub name: String,
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub scan: ScanOptions,
    pub references: Option<ReferenceExtractor>,
    pub output_exclude: ExcludePolicy,
    pub collect: bool,
}

impl Format {
    /// Resolve a configured format, applying `kinds` to flat exclude lists.
    pub fn from_config(config: &FormatConfig, kinds: MatchKinds) -> Self {
        Self {
            name: config.name.clone(),
            source_root: config.source_dir.clone(),
            output_root: config.output_dir.clone(),
            scan: config.scan_options(kinds),
            references: config.references.clone(),
            output_exclude: config.output_exclude_policy(kinds),
            collect: config.collect,
        }
    }

    fn graph(&self) -> Option<ReferenceGraph> {
        self.references
            .clone()
            .map(|extractor| ReferenceGraph::new(&self.source_root, extractor))
    }
}

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Format name.
    pub format: String,

    /// Sources tracked by the scan.
    pub scanned: usize,

    /// Sources rebuilt, relative to the source root.
    pub built: Vec<PathBuf>,

    /// Sources evaluated and found up to date. A full pass evaluates every
    /// scanned source; a per-change pass only the affected ones.
    pub fresh: usize,

    /// Sources whose transform or write failed, with the reason.
    pub failed: Vec<(PathBuf, String)>,

    /// Outputs moved into quarantine.
    pub evicted: usize,

    /// References that resolved nowhere.
    pub dangling: usize,
}

/// Run a full pass: rebuild everything stale, then collect orphans.
///
/// Only a missing source root fails the pass.
pub fn run_pass(
    format: &Format,
    transformer: &dyn Transformer,
    collector: &Collector,
) -> Result<PassReport> {
    let files = scan(&format.source_root, &format.output_root, &format.scan)?;
    let mut graph = format.graph();
    let stale = stale_among(files.iter(), graph.as_mut());

    let mut report = PassReport {
        format: format.name.clone(),
        scanned: files.len(),
        fresh: files.len() - stale.len(),
        dangling: graph.as_ref().map_or(0, |g| g.dangling().len()),
        ..PassReport::default()
    };

    build_files(format, transformer, &stale, &mut report);
    collect_orphans(format, collector, &files, &mut report);

    info!(
        "Pass {}: {} built, {} fresh, {} failed, {} evicted",
        report.format,
        report.built.len(),
        report.fresh,
        report.failed.len(),
        report.evicted
    );
    Ok(report)
}

/// Run a pass for one changed file, as reported by the live watcher.
///
/// The affected sources are the changed file itself when it is tracked,
/// plus every tracked source that transitively references it. Those are
/// rebuilt if stale; collection runs afterwards as in a full pass.
pub fn run_for_change(
    format: &Format,
    transformer: &dyn Transformer,
    collector: &Collector,
    changed: &Path,
) -> Result<PassReport> {
    let files = scan(&format.source_root, &format.output_root, &format.scan)?;
    let mut graph = format.graph();

    let dependents = match graph.as_mut() {
        Some(graph) => {
            graph.dependents_of(changed, files.iter().map(|f| f.relative_path.as_path()))
        }
        None => Vec::new(),
    };
    let affected: Vec<&TrackedFile> = files
        .iter()
        .filter(|f| f.relative_path == changed || dependents.contains(&f.relative_path))
        .collect();

    if affected.is_empty() {
        debug!(
            "Change to {} affects no {} output",
            changed.display(),
            format.name
        );
    }

    let stale = stale_among(affected.iter().copied(), graph.as_mut());

    let mut report = PassReport {
        format: format.name.clone(),
        scanned: files.len(),
        fresh: affected.len() - stale.len(),
        dangling: graph.as_ref().map_or(0, |g| g.dangling().len()),
        ..PassReport::default()
    };

    build_files(format, transformer, &stale, &mut report);
    collect_orphans(format, collector, &files, &mut report);

    info!(
        "Rebuilt {} {} output(s) after change to {}",
        report.built.len(),
        report.format,
        changed.display()
    );
    Ok(report)
}

/// Filter `candidates` down to the stale ones.
///
/// Every stale source's references are resolved as well, so dangling ones
/// are reported even for files that needed no graph walk.
fn stale_among<'a>(
    candidates: impl Iterator<Item = &'a TrackedFile>,
    mut graph: Option<&mut ReferenceGraph>,
) -> Vec<&'a TrackedFile> {
    candidates
        .filter(|file| match graph.as_deref_mut() {
            Some(graph) => {
                let stale = is_stale(file, graph);
                if stale {
                    graph.reachable(&file.relative_path);
                }
                stale
            }
            None => file.needs_build(),
        })
        .collect()
}

fn build_files(
    format: &Format,
    transformer: &dyn Transformer,
    stale: &[&TrackedFile],
    report: &mut PassReport,
) {
    for file in stale {
        match build_one(format, transformer, file) {
            Ok(()) => {
                debug!("Built {}", file.target.display());
                report.built.push(file.relative_path.clone());
            }
            Err(e) => {
                warn!("Failed to build {}: {e:#}", file.source.display());
                report
                    .failed
                    .push((file.relative_path.clone(), format!("{e:#}")));
            }
        }
    }
}

fn build_one(
    format: &Format,
    transformer: &dyn Transformer,
    file: &TrackedFile,
) -> anyhow::Result<()> {
    let content = transformer.transform(&format.source_root, &file.relative_path)?;
    fs::create_dir_all(&file.target_dir)?;
    fs::write(&file.target, content)?;
    Ok(())
}

fn collect_orphans(
    format: &Format,
    collector: &Collector,
    files: &[TrackedFile],
    report: &mut PassReport,
) {
    if !format.collect {
        return;
    }
    if !format.output_root.is_dir() {
        debug!(
            "Nothing to collect, {} does not exist",
            format.output_root.display()
        );
        return;
    }

    let keep = files.iter().map(|f| f.target.as_path());
    match collector.collect(
        &format.scan.target_extension,
        &format.output_root,
        keep,
        &format.output_exclude,
    ) {
        Ok(collected) => report.evicted = collected.evicted(),
        Err(e) => warn!("Collection skipped for {}: {e}", format.name),
    }
}
