//! The seam to content transformers.
//!
//! Transformers (style compiler, template renderer, script transpiler) are
//! external. A pass only calls them for stale files and writes whatever they
//! return to the output path; the content itself is opaque here.

use std::path::Path;

/// Produces the output content for one source.
pub trait Transformer: Send + Sync {
    /// Render `source_rel_path`, relative to `source_dir`.
    fn transform(&self, source_dir: &Path, source_rel_path: &Path) -> anyhow::Result<String>;
}

impl<F> Transformer for F
where
    F: Fn(&Path, &Path) -> anyhow::Result<String> + Send + Sync,
{
    fn transform(&self, source_dir: &Path, source_rel_path: &Path) -> anyhow::Result<String> {
        self(source_dir, source_rel_path)
    }
}

/// Copies the source through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTransformer;

impl Transformer for CopyTransformer {
    fn transform(&self, source_dir: &Path, source_rel_path: &Path) -> anyhow::Result<String> {
        Ok(std::fs::read_to_string(source_dir.join(source_rel_path))?)
    }
}
