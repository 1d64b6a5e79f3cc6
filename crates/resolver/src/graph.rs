//! Dependency graph for a project snapshot
//!
//! Every import of every file is classified, resolved and bound to a file.
//! Internal matches become edges; external and unresolved imports stay out of
//! the graph and are kept for reporting.

use crate::extractor::ImportIndex;
use crate::registry::{ExternalLibraryReference, LibraryRegistry};
use crate::resolver::{FileLocator, PathResolver};
use crate::{
    AmbiguousImport, ImportEdge, ImportTarget, MissingImport, ResolverError, ResolverResult,
};
use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use project::{FileId, ProjectTree};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Dependency graph over the internal files of a snapshot
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<FileId, ()>,
    /// Map from file id to node index
    node_map: HashMap<FileId, NodeIndex>,
    /// Direct dependencies in import order, deduplicated
    adjacency: BTreeMap<FileId, Vec<FileId>>,
    /// Files in tree order
    order: Vec<FileId>,
    paths: HashMap<FileId, String>,
    imports: BTreeMap<FileId, Vec<ImportEdge>>,
    external: Vec<ExternalLibraryReference>,
    missing: Vec<MissingImport>,
    ambiguous: Vec<AmbiguousImport>,
}

impl DependencyGraph {
    /// Build the graph from a snapshot and its parsed imports
    pub fn build(
        tree: &ProjectTree,
        index: &ImportIndex,
        registry: &LibraryRegistry,
        resolver: &PathResolver,
    ) -> ResolverResult<Self> {
        let locator = FileLocator::new(tree)?;
        let files = tree.canonical_paths()?;

        let mut this = Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            adjacency: BTreeMap::new(),
            order: Vec::with_capacity(files.len()),
            paths: HashMap::new(),
            imports: BTreeMap::new(),
            external: Vec::new(),
            missing: Vec::new(),
            ambiguous: Vec::new(),
        };

        // First pass: add all files as nodes
        for (id, path) in &files {
            let idx = this.graph.add_node(*id);
            this.node_map.insert(*id, idx);
            this.adjacency.insert(*id, Vec::new());
            this.order.push(*id);
            this.paths.insert(*id, path.clone());
        }

        // Second pass: classify and resolve imports
        for (id, path) in &files {
            let mut edges = Vec::new();
            for import in index.get(*id) {
                let target =
                    this.process_import(*id, path, &import.path, &locator, registry, resolver)?;
                edges.push(ImportEdge {
                    source: *id,
                    raw: import.path.clone(),
                    target,
                });
            }
            this.imports.insert(*id, edges);
        }

        tracing::info!(
            "Dependency graph: {} files, {} edges, {} external, {} missing",
            this.graph.node_count(),
            this.graph.edge_count(),
            this.external.len(),
            this.missing.len()
        );

        Ok(this)
    }

    fn process_import(
        &mut self,
        source: FileId,
        source_path: &str,
        raw: &str,
        locator: &FileLocator,
        registry: &LibraryRegistry,
        resolver: &PathResolver,
    ) -> ResolverResult<ImportTarget> {
        if let Some(reference) = registry.reference(raw) {
            let prefix = reference.prefix.clone();
            self.external.push(reference);
            return Ok(ImportTarget::External(prefix));
        }

        let resolved = match resolver.resolve(source_path, raw) {
            Ok(resolved) => resolved,
            Err(err @ ResolverError::PathEscapesRoot { .. }) => {
                tracing::warn!("{}", err);
                self.missing.push(MissingImport {
                    source,
                    source_path: source_path.to_string(),
                    raw: raw.to_string(),
                    reason: Some(err.to_string()),
                });
                return Ok(ImportTarget::Unresolved);
            }
            Err(err) => return Err(err),
        };

        let lookup = locator.locate(&resolved);
        let Some(target) = lookup.file() else {
            tracing::warn!("Could not resolve import '{}' in {}", raw, source_path);
            self.missing.push(MissingImport {
                source,
                source_path: source_path.to_string(),
                raw: raw.to_string(),
                reason: None,
            });
            return Ok(ImportTarget::Unresolved);
        };

        if let crate::Lookup::ByName { candidates, .. } = &lookup {
            if candidates.len() > 1 {
                let candidates: Vec<String> = candidates
                    .iter()
                    .filter_map(|id| locator.path_of(*id).map(str::to_string))
                    .collect();
                let chosen = locator.path_of(target).unwrap_or_default().to_string();
                tracing::warn!(
                    "Import '{}' in {} matches {} files by name, using {}",
                    raw,
                    source_path,
                    candidates.len(),
                    chosen
                );
                self.ambiguous.push(AmbiguousImport {
                    source,
                    source_path: source_path.to_string(),
                    raw: raw.to_string(),
                    chosen,
                    candidates,
                });
            }
        }

        let deps = self.adjacency.entry(source).or_default();
        if !deps.contains(&target) {
            deps.push(target);
            let from_idx = self.node_map[&source];
            let to_idx = self.node_map[&target];
            self.graph.add_edge(from_idx, to_idx, ());
        }

        Ok(ImportTarget::File(target))
    }

    /// Get files in topological order (dependencies first)
    pub fn topological_order(&self) -> ResolverResult<Vec<FileId>> {
        let mut reversed = DiGraph::new();
        let mut reverse_map: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        for node_idx in self.graph.node_indices() {
            let new_idx = reversed.add_node(self.graph[node_idx]);
            reverse_map.insert(node_idx, new_idx);
        }

        for edge in self.graph.edge_references() {
            let source = reverse_map[&edge.source()];
            let target = reverse_map[&edge.target()];
            reversed.add_edge(target, source, ());
        }

        match toposort(&reversed, None) {
            Ok(order) => Ok(order.into_iter().map(|idx| reversed[idx]).collect()),
            Err(cycle) => {
                let file = reversed[cycle.node_id()];
                Err(ResolverError::CircularDependency(format!(
                    "Circular dependency detected involving: {}",
                    self.path(file).unwrap_or_default()
                )))
            }
        }
    }

    /// Direct internal dependencies of a file, in import order
    pub fn dependencies(&self, file: FileId) -> &[FileId] {
        self.adjacency
            .get(&file)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Files that import the given file
    pub fn dependents(&self, file: FileId) -> Vec<FileId> {
        let Some(&idx) = self.node_map.get(&file) else {
            return Vec::new();
        };
        let mut dependents: Vec<FileId> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        dependents.sort();
        dependents.dedup();
        dependents
    }

    /// Import statements of a file and where they point
    pub fn imports_of(&self, file: FileId) -> &[ImportEdge] {
        self.imports.get(&file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All import statements, grouped by file
    pub fn edges(&self) -> impl Iterator<Item = &ImportEdge> {
        self.order.iter().flat_map(|id| self.imports_of(*id))
    }

    /// Check if there are any circular dependencies
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Whether a file is part of the graph
    pub fn contains(&self, file: FileId) -> bool {
        self.node_map.contains_key(&file)
    }

    /// Canonical path of a file as seen when the graph was built
    pub fn path(&self, file: FileId) -> Option<&str> {
        self.paths.get(&file).map(String::as_str)
    }

    /// All files in tree order
    pub fn files(&self) -> &[FileId] {
        &self.order
    }

    pub fn adjacency(&self) -> &BTreeMap<FileId, Vec<FileId>> {
        &self.adjacency
    }

    pub fn external(&self) -> &[ExternalLibraryReference] {
        &self.external
    }

    pub fn missing(&self) -> &[MissingImport] {
        &self.missing
    }

    pub fn ambiguous(&self) -> &[AmbiguousImport] {
        &self.ambiguous
    }

    /// Raw paths of unresolved imports
    pub fn missing_paths(&self) -> Vec<&str> {
        self.missing.iter().map(|m| m.raw.as_str()).collect()
    }

    /// Distinct library prefixes referenced anywhere in the project
    pub fn external_prefixes(&self) -> BTreeSet<&str> {
        self.external.iter().map(|e| e.prefix.as_str()).collect()
    }

    /// Get the number of files in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Serializable view with canonical paths instead of ids
    pub fn report(&self) -> GraphReport {
        let files = self
            .order
            .iter()
            .map(|id| GraphNode {
                id: *id,
                path: self.path(*id).unwrap_or_default().to_string(),
                dependencies: self
                    .dependencies(*id)
                    .iter()
                    .filter_map(|dep| self.path(*dep).map(str::to_string))
                    .collect(),
            })
            .collect();

        GraphReport {
            files,
            external: self.external.clone(),
            missing: self.missing.clone(),
            ambiguous: self.ambiguous.clone(),
            has_cycles: self.has_cycles(),
        }
    }
}

/// One file of a `GraphReport`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: FileId,
    pub path: String,
    pub dependencies: Vec<String>,
}

/// Serializable summary of a dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphReport {
    pub files: Vec<GraphNode>,
    pub external: Vec<ExternalLibraryReference>,
    pub missing: Vec<MissingImport>,
    pub ambiguous: Vec<AmbiguousImport>,
    pub has_cycles: bool,
}
