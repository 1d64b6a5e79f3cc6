//! Change tracking for incremental graph rebuilds
//!
//! Each file is fingerprinted by its canonical path and a blake3 hash of its
//! content. A rebuild happens only when the fingerprint set differs from the
//! one seen last time, and only changed files are re-parsed.

use crate::ResolverResult;
use crate::extractor::{ImportExtractor, ImportIndex};
use crate::graph::DependencyGraph;
use crate::registry::LibraryRegistry;
use crate::resolver::PathResolver;
use crate::unit::{CompilationUnit, UnitAssembler};
use project::{FileId, ProjectTree};
use std::collections::BTreeMap;

/// Identity of one file's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub path: String,
    pub content_hash: String,
}

/// Differences between two observed snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<FileId>,
    /// Content changed
    pub modified: Vec<FileId>,
    /// Canonical path changed, content did not
    pub moved: Vec<FileId>,
    pub removed: Vec<FileId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.modified.is_empty()
            && self.moved.is_empty()
            && self.removed.is_empty()
    }

    /// Files whose imports must be parsed again
    pub fn needs_parsing(&self) -> impl Iterator<Item = FileId> + '_ {
        self.added.iter().chain(self.modified.iter()).copied()
    }
}

/// Keeps the last observed fingerprint of every file
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    fingerprints: BTreeMap<FileId, Fingerprint>,
    generation: u64,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `tree` with the previous observation and remember it
    pub fn observe(&mut self, tree: &ProjectTree) -> ResolverResult<ChangeSet> {
        let mut current = BTreeMap::new();
        for (id, path) in tree.canonical_paths()? {
            let content = tree.file(id)?.content();
            current.insert(
                id,
                Fingerprint {
                    path,
                    content_hash: content_hash(content),
                },
            );
        }

        let mut changes = ChangeSet::default();
        for (id, now) in &current {
            match self.fingerprints.get(id) {
                None => changes.added.push(*id),
                Some(before) if before.content_hash != now.content_hash => {
                    changes.modified.push(*id)
                }
                Some(before) if before.path != now.path => changes.moved.push(*id),
                Some(_) => {}
            }
        }
        changes.removed = self
            .fingerprints
            .keys()
            .filter(|id| !current.contains_key(id))
            .copied()
            .collect();

        if !changes.is_empty() {
            self.generation += 1;
            tracing::debug!(
                "Snapshot generation {}: {} added, {} modified, {} moved, {} removed",
                self.generation,
                changes.added.len(),
                changes.modified.len(),
                changes.moved.len(),
                changes.removed.len()
            );
        }

        self.fingerprints = current;
        Ok(changes)
    }

    /// Incremented every time an observation differs from the previous one
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fingerprint(&self, id: FileId) -> Option<&Fingerprint> {
        self.fingerprints.get(&id)
    }

    /// Forget everything, the next observation reports all files as added
    pub fn clear(&mut self) {
        self.fingerprints.clear();
    }
}

/// Calculate content hash for change detection
pub fn content_hash(content: &str) -> String {
    use blake3::Hasher;
    let mut hasher = Hasher::new();
    hasher.update(content.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// A dependency graph kept in sync with a changing snapshot
pub struct IncrementalGraph {
    extractor: ImportExtractor,
    registry: LibraryRegistry,
    resolver: PathResolver,
    tracker: ChangeTracker,
    index: ImportIndex,
    graph: Option<DependencyGraph>,
    rebuilds: usize,
}

impl IncrementalGraph {
    pub fn new(registry: LibraryRegistry, resolver: PathResolver) -> Self {
        Self {
            extractor: ImportExtractor::new(),
            registry,
            resolver,
            tracker: ChangeTracker::new(),
            index: ImportIndex::default(),
            graph: None,
            rebuilds: 0,
        }
    }

    /// Bring the graph up to date with `tree`
    pub fn refresh(&mut self, tree: &ProjectTree) -> ResolverResult<&DependencyGraph> {
        let changes = self.tracker.observe(tree)?;

        let graph = match self.graph.take() {
            Some(graph) if changes.is_empty() => {
                tracing::debug!("Snapshot unchanged, reusing dependency graph");
                graph
            }
            Some(_) => {
                for id in &changes.removed {
                    self.index.remove(*id);
                }
                for id in changes.needs_parsing() {
                    let imports = self.extractor.extract(tree.file(id)?.content());
                    self.index.insert(id, imports);
                }
                self.index.retain_files(tree);

                self.rebuilds += 1;
                DependencyGraph::build(tree, &self.index, &self.registry, &self.resolver)?
            }
            None => {
                // First refresh, or the previous one failed part-way
                self.index = ImportIndex::scan(tree, &self.extractor);

                self.rebuilds += 1;
                DependencyGraph::build(tree, &self.index, &self.registry, &self.resolver)?
            }
        };

        Ok(self.graph.insert(graph))
    }

    /// Refresh, then assemble the unit rooted at `root`
    pub fn assemble(
        &mut self,
        tree: &ProjectTree,
        root: FileId,
    ) -> ResolverResult<CompilationUnit> {
        let graph = self.refresh(tree)?;
        UnitAssembler::new(tree, graph).assemble(root)
    }

    /// The graph from the last refresh
    pub fn graph(&self) -> Option<&DependencyGraph> {
        self.graph.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.tracker.generation()
    }

    /// How many times the graph was rebuilt
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    pub fn index(&self) -> &ImportIndex {
        &self.index
    }
}
