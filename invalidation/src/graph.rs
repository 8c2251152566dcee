//! Per-pass reference graph.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use quire_changeset::modified_millis;
use tracing::{debug, warn};

use crate::error::{DanglingReference, InvalidationError};
use crate::extractor::{ExtractReferences, ReferenceExtractor};

/// Reference edges between files under one root, discovered on demand.
///
/// A graph lives for exactly one pass: edges and timestamps are read from
/// disk the first time they are needed and assumed static afterwards.
pub struct ReferenceGraph {
    /// Scan root every key is relative to.
    root: PathBuf,

    /// Extractor for this root's file format.
    extractor: ReferenceExtractor,

    /// Resolved, ordered references per file.
    edges: HashMap<PathBuf, Vec<PathBuf>>,

    /// Modification times read so far.
    mtimes: HashMap<PathBuf, u64>,

    /// Newest modification time among everything reachable from a file.
    newest: HashMap<PathBuf, u64>,

    /// References that resolved nowhere.
    dangling: Vec<DanglingReference>,

    /// Number of modification times read from disk.
    stat_count: usize,
}

impl ReferenceGraph {
    /// Create an empty graph for `root`.
    pub fn new(root: impl Into<PathBuf>, extractor: impl Into<ReferenceExtractor>) -> Self {
        Self {
            root: root.into(),
            extractor: extractor.into(),
            edges: HashMap::new(),
            mtimes: HashMap::new(),
            newest: HashMap::new(),
            dangling: Vec::new(),
            stat_count: 0,
        }
    }

    /// The root all graph paths are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// References of `relative`, extracting them on first use.
    pub fn references(&mut self, relative: &Path) -> Vec<PathBuf> {
        if let Some(edges) = self.edges.get(relative) {
            return edges.clone();
        }

        let edges = match self.extract(relative) {
            Ok(edges) => edges,
            Err(e) => {
                warn!("Treating {} as having no references: {e}", relative.display());
                Vec::new()
            }
        };

        self.edges.insert(relative.to_path_buf(), edges.clone());
        edges
    }

    fn extract(&mut self, relative: &Path) -> Result<Vec<PathBuf>, InvalidationError> {
        let path = self.root.join(relative);
        let contents = std::fs::read_to_string(&path)
            .map_err(|source| InvalidationError::Read { path, source })?;

        let mut edges = Vec::new();
        for name in self.extractor.extract(&contents) {
            match self.extractor.resolve(&self.root, relative, &name) {
                Ok(target) => {
                    if !edges.contains(&target) {
                        edges.push(target);
                    }
                }
                Err(dangling) => {
                    warn!("{dangling}");
                    self.dangling.push(dangling);
                }
            }
        }

        debug!("{} references {} file(s)", relative.display(), edges.len());
        Ok(edges)
    }

    /// Modification time of `relative`, read at most once per pass.
    pub fn mtime(&mut self, relative: &Path) -> u64 {
        if let Some(&mtime) = self.mtimes.get(relative) {
            return mtime;
        }

        self.stat_count += 1;
        let mtime = modified_millis(&self.root.join(relative));
        self.mtimes.insert(relative.to_path_buf(), mtime);
        mtime
    }

    /// Newest modification time among files transitively referenced by
    /// `relative`, excluding `relative` itself unless a cycle leads back.
    ///
    /// Results are memoized for the rest of the pass.
    pub fn newest_reference(&mut self, relative: &Path) -> u64 {
        let mut walk = Vec::new();
        self.walk_newest(relative, &mut walk).0
    }

    /// `walk` is the current path from the walk's root. Returns the newest
    /// time found and the shallowest walk depth a cycle led back to.
    ///
    /// A file whose subtree led back above it is only partially explored
    /// from here, so it is not memoized.
    fn walk_newest(&mut self, relative: &Path, walk: &mut Vec<PathBuf>) -> (u64, Option<usize>) {
        if let Some(&newest) = self.newest.get(relative) {
            return (newest, None);
        }
        if let Some(depth) = walk.iter().position(|p| p == relative) {
            return (0, Some(depth));
        }

        let depth = walk.len();
        walk.push(relative.to_path_buf());

        let mut newest = 0;
        let mut cycle_to = None;
        for reference in self.references(relative) {
            newest = newest.max(self.mtime(&reference));
            let (below, reached) = self.walk_newest(&reference, walk);
            newest = newest.max(below);
            cycle_to = cycle_to.into_iter().chain(reached).min();
        }

        walk.pop();
        match cycle_to {
            Some(reached) if reached < depth => (newest, Some(reached)),
            _ => {
                self.newest.insert(relative.to_path_buf(), newest);
                (newest, None)
            }
        }
    }

    /// Every file transitively reachable from `relative`.
    pub fn reachable(&mut self, relative: &Path) -> HashSet<PathBuf> {
        let mut seen = HashSet::new();
        let mut stack = vec![relative.to_path_buf()];

        while let Some(current) = stack.pop() {
            for reference in self.references(&current) {
                if seen.insert(reference.clone()) {
                    stack.push(reference);
                }
            }
        }

        seen
    }

    /// The subset of `candidates` that transitively reference `changed`.
    pub fn dependents_of<'a, I>(&mut self, changed: &Path, candidates: I) -> Vec<PathBuf>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        candidates
            .into_iter()
            .filter(|candidate| self.reachable(candidate).contains(changed))
            .map(Path::to_path_buf)
            .collect()
    }

    /// Dangling references seen so far in this pass.
    pub fn dangling(&self) -> &[DanglingReference] {
        &self.dangling
    }

    /// How many modification times have been read from disk.
    pub fn stat_count(&self) -> usize {
        self.stat_count
    }
}
