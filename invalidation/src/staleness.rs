//! Staleness decisions across transitive references.

use quire_changeset::{FileStatus, TrackedFile};
use tracing::debug;

use crate::graph::ReferenceGraph;

/// Whether `file`'s output must be regenerated.
///
/// Anything the scanner did not report as `Unchanged` is stale. An
/// `Unchanged` file is stale only when something it transitively references
/// was modified strictly after its output was written.
pub fn is_stale(file: &TrackedFile, graph: &mut ReferenceGraph) -> bool {
    if file.status != FileStatus::Unchanged {
        return true;
    }

    let newest = graph.newest_reference(&file.relative_path);

    if newest > file.target_last_modified {
        debug!(
            "{} is stale: a reference changed at {newest}, output written at {}",
            file.relative_path.display(),
            file.target_last_modified
        );
        return true;
    }

    false
}

/// Filter a scan down to the files that need rebuilding.
pub fn stale_files<'a>(
    files: &'a [TrackedFile],
    graph: &mut ReferenceGraph,
) -> Vec<&'a TrackedFile> {
    files.iter().filter(|file| is_stale(file, graph)).collect()
}
