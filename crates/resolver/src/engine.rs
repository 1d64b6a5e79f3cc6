//! Entry points used by the studio front end
//!
//! Bundles the extractor, the injected library registry and the path resolver
//! behind the handful of operations the UI calls.

use crate::{Import, ResolverResult};
use crate::extractor::{ImportExtractor, ImportIndex};
use crate::graph::DependencyGraph;
use crate::registry::{LibraryInfo, LibraryRegistry};
use crate::resolver::{PathResolver, RootPolicy};
use crate::tracker::IncrementalGraph;
use crate::unit::{CompilationUnit, UnitAssembler};
use project::{FileId, ProjectFile, ProjectTree};

/// Resolution engine configured with a registry and a root policy
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    extractor: ImportExtractor,
    registry: LibraryRegistry,
    resolver: PathResolver,
}

impl Default for ResolutionEngine {
    fn default() -> Self {
        Self::new(LibraryRegistry::builtin(), RootPolicy::default())
    }
}

impl ResolutionEngine {
    pub fn new(registry: LibraryRegistry, policy: RootPolicy) -> Self {
        Self {
            extractor: ImportExtractor::new(),
            registry,
            resolver: PathResolver::new(policy),
        }
    }

    /// Raw import paths of one file; folders have none
    pub fn imports_for(&self, file: &ProjectFile) -> Vec<String> {
        if !file.is_file() {
            return Vec::new();
        }
        self.extractor.import_paths(file.content())
    }

    /// Parsed import statements of one file, in source order
    pub fn parse_imports(&self, file: &ProjectFile) -> Vec<Import> {
        if !file.is_file() {
            return Vec::new();
        }
        self.extractor.extract(file.content())
    }

    /// Resolve `raw` as written in the file at `from_path`
    pub fn resolve_import(&self, from_path: &str, raw: &str) -> ResolverResult<String> {
        self.resolver.resolve(from_path, raw)
    }

    /// Known library an import belongs to, if any
    pub fn classify(&self, raw: &str) -> Option<&LibraryInfo> {
        self.registry.classify(raw)
    }

    /// Build the dependency graph of a snapshot from scratch
    pub fn build_dependency_graph(&self, tree: &ProjectTree) -> ResolverResult<DependencyGraph> {
        let index = ImportIndex::scan(tree, &self.extractor);
        DependencyGraph::build(tree, &index, &self.registry, &self.resolver)
    }

    /// Collect everything needed to compile `root`
    pub fn assemble_compilation_unit(
        &self,
        root: FileId,
        tree: &ProjectTree,
    ) -> ResolverResult<CompilationUnit> {
        let graph = self.build_dependency_graph(tree)?;
        UnitAssembler::new(tree, &graph).assemble(root)
    }

    /// An incremental graph sharing this engine's configuration
    pub fn incremental(&self) -> IncrementalGraph {
        IncrementalGraph::new(self.registry.clone(), self.resolver)
    }

    pub fn registry(&self) -> &LibraryRegistry {
        &self.registry
    }

    pub fn root_policy(&self) -> RootPolicy {
        self.resolver.policy()
    }
}
