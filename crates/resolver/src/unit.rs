//! Compilation-unit assembly
//!
//! A depth-first walk from the entry file collects every reachable internal
//! file exactly once, together with the external libraries those files use.
//! Re-entering a file that is still on the walk stack is a cycle: it is recorded
//! and the edge is not expanded, the walk itself carries on.

use crate::graph::DependencyGraph;
use crate::{ImportTarget, MissingImport, ResolverError, ResolverResult};
use project::{FileId, ProjectTree};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Everything the compiler service needs for one entry file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationUnit {
    pub root: FileId,
    /// Canonical path of the entry file
    pub entry_path: String,
    /// Canonical path → source for every reachable internal file
    pub files: BTreeMap<String, String>,
    /// Distinct library prefixes used by the unit
    pub external_libraries: BTreeSet<String>,
    /// Concrete external import paths used by the unit
    pub external_imports: BTreeSet<String>,
    /// Unresolved imports of files inside the unit
    pub missing: Vec<MissingImport>,
    pub had_cycle: bool,
    /// Each detected cycle, from the re-entered file back to itself
    pub cycles: Vec<Vec<String>>,
    /// Canonical paths, dependencies before dependents
    source_order: Vec<String>,
}

impl CompilationUnit {
    /// Canonical paths in dependencies-first order
    pub fn source_order(&self) -> &[String] {
        &self.source_order
    }

    /// Source of the entry file
    pub fn entry_source(&self) -> Option<&str> {
        self.files.get(&self.entry_path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Collects the compilation unit of an entry file
pub struct UnitAssembler<'a> {
    tree: &'a ProjectTree,
    graph: &'a DependencyGraph,
}

impl<'a> UnitAssembler<'a> {
    pub fn new(tree: &'a ProjectTree, graph: &'a DependencyGraph) -> Self {
        Self { tree, graph }
    }

    /// Walk the graph from `root`
    pub fn assemble(&self, root: FileId) -> ResolverResult<CompilationUnit> {
        let entry = self
            .tree
            .get(root)
            .ok_or(ResolverError::UnknownFile(root))?;
        if !entry.is_file() {
            return Err(ResolverError::NotASourceFile(entry.name.clone()));
        }
        if !self.graph.contains(root) {
            return Err(ResolverError::UnknownFile(root));
        }

        let mut walk = Walk {
            tree: self.tree,
            graph: self.graph,
            state: HashMap::new(),
            stack: Vec::new(),
            unit: CompilationUnit {
                root,
                entry_path: self.path(root)?,
                files: BTreeMap::new(),
                external_libraries: BTreeSet::new(),
                external_imports: BTreeSet::new(),
                missing: Vec::new(),
                had_cycle: false,
                cycles: Vec::new(),
                source_order: Vec::new(),
            },
        };
        walk.visit(root)?;
        let unit = walk.unit;

        tracing::info!(
            "Compilation unit for {}: {} files, {} external libraries{}",
            unit.entry_path,
            unit.files.len(),
            unit.external_libraries.len(),
            if unit.had_cycle { ", cycle detected" } else { "" }
        );

        Ok(unit)
    }

    fn path(&self, id: FileId) -> ResolverResult<String> {
        match self.graph.path(id) {
            Some(path) => Ok(path.to_string()),
            None => Ok(self.tree.canonical_path(id)?),
        }
    }
}

struct Walk<'a> {
    tree: &'a ProjectTree,
    graph: &'a DependencyGraph,
    state: HashMap<FileId, VisitState>,
    stack: Vec<FileId>,
    unit: CompilationUnit,
}

impl Walk<'_> {
    fn visit(&mut self, id: FileId) -> ResolverResult<()> {
        match self.state.get(&id) {
            Some(VisitState::InProgress) => {
                self.record_cycle(id);
                return Ok(());
            }
            Some(VisitState::Done) => return Ok(()),
            None => {}
        }

        let graph = self.graph;
        self.state.insert(id, VisitState::InProgress);
        self.stack.push(id);

        let path = self.path(id);
        let content = self.tree.file(id)?.content().to_string();
        self.unit.files.insert(path.clone(), content);

        for edge in graph.imports_of(id) {
            if let ImportTarget::External(prefix) = &edge.target {
                self.unit.external_libraries.insert(prefix.clone());
                self.unit.external_imports.insert(edge.raw.clone());
            }
        }
        self.unit.missing.extend(
            graph
                .missing()
                .iter()
                .filter(|m| m.source == id)
                .cloned(),
        );

        for dep in graph.dependencies(id) {
            self.visit(*dep)?;
        }

        self.stack.pop();
        self.state.insert(id, VisitState::Done);
        self.unit.source_order.push(path);

        Ok(())
    }

    fn record_cycle(&mut self, reentered: FileId) {
        let start = self
            .stack
            .iter()
            .position(|id| *id == reentered)
            .unwrap_or(0);
        let mut cycle: Vec<String> = self.stack[start..]
            .iter()
            .map(|id| self.path(*id))
            .collect();
        cycle.push(self.path(reentered));

        tracing::warn!("Dependency cycle: {}", cycle.join(" -> "));

        self.unit.had_cycle = true;
        self.unit.cycles.push(cycle);
    }

    fn path(&self, id: FileId) -> String {
        self.graph.path(id).unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ImportExtractor, ImportIndex};
    use crate::registry::LibraryRegistry;
    use crate::resolver::PathResolver;

    fn assemble(tree: &ProjectTree, root: &str) -> CompilationUnit {
        let index = ImportIndex::scan(tree, &ImportExtractor::new());
        let graph = DependencyGraph::build(
            tree,
            &index,
            &LibraryRegistry::builtin(),
            &PathResolver::default(),
        )
        .unwrap();
        let root = tree.find_by_path(root).unwrap();
        UnitAssembler::new(tree, &graph).assemble(root).unwrap()
    }

    #[test]
    fn test_mutual_import_terminates_with_cycle() {
        let mut tree = ProjectTree::new();
        tree.insert_path("A.sol", "import \"./B.sol\";\ncontract A {}")
            .unwrap();
        tree.insert_path("B.sol", "import \"./A.sol\";\ncontract B {}")
            .unwrap();

        let unit = assemble(&tree, "A.sol");
        assert!(unit.had_cycle);
        assert_eq!(unit.files.len(), 2);
        assert!(unit.files.contains_key("A.sol"));
        assert!(unit.files.contains_key("B.sol"));
        assert_eq!(unit.cycles, vec![vec!["A.sol", "B.sol", "A.sol"]]);
    }

    #[test]
    fn test_diamond_visits_shared_file_once() {
        let mut tree = ProjectTree::new();
        tree.insert_path("Main.sol", "import \"./L.sol\";\nimport \"./R.sol\";")
            .unwrap();
        tree.insert_path("L.sol", "import \"./Shared.sol\";").unwrap();
        tree.insert_path("R.sol", "import \"./Shared.sol\";").unwrap();
        tree.insert_path("Shared.sol", "library Shared {}").unwrap();
        tree.insert_path("Unrelated.sol", "contract Unrelated {}").unwrap();

        let unit = assemble(&tree, "Main.sol");
        assert!(!unit.had_cycle);
        assert_eq!(unit.files.len(), 4);
        assert!(!unit.files.contains_key("Unrelated.sol"));
        assert_eq!(
            unit.source_order(),
            &["Shared.sol", "L.sol", "R.sol", "Main.sol"]
        );
    }

    #[test]
    fn test_external_libraries_are_deduplicated() {
        let mut tree = ProjectTree::new();
        tree.insert_path(
            "A.sol",
            "import \"@openzeppelin/contracts/access/Ownable.sol\";\nimport \"@openzeppelin/contracts/token/ERC20/ERC20.sol\";",
        )
        .unwrap();
        tree.insert_path(
            "B.sol",
            "import \"@openzeppelin/contracts/utils/Pausable.sol\";",
        )
        .unwrap();

        let unit = assemble(&tree, "A.sol");
        assert_eq!(
            unit.external_libraries.iter().collect::<Vec<_>>(),
            vec!["@openzeppelin/contracts/"]
        );
        assert_eq!(unit.external_imports.len(), 2);
        assert_eq!(unit.files.len(), 1);
    }

    #[test]
    fn test_main_lib_security_scenario() {
        let mut tree = ProjectTree::new();
        tree.insert_path("Main.sol", "import \"./Lib.sol\";\ncontract Main {}")
            .unwrap();
        tree.insert_path(
            "Lib.sol",
            "import \"@openzeppelin/contracts/utils/ReentrancyGuard.sol\";\nlibrary Lib {}",
        )
        .unwrap();
        tree.insert_path("Other.sol", "contract Other {}").unwrap();

        let unit = assemble(&tree, "Main.sol");
        assert_eq!(unit.files.len(), 2);
        assert!(unit.files.contains_key("Main.sol"));
        assert!(unit.files.contains_key("Lib.sol"));
        assert_eq!(unit.external_libraries.len(), 1);
        assert_eq!(unit.entry_source(), Some("import \"./Lib.sol\";\ncontract Main {}"));
    }

    #[test]
    fn test_missing_imports_do_not_block_assembly() {
        let mut tree = ProjectTree::new();
        tree.insert_path("Main.sol", "import \"./Gone.sol\";\nimport \"./Here.sol\";")
            .unwrap();
        tree.insert_path("Here.sol", "contract Here {}").unwrap();

        let unit = assemble(&tree, "Main.sol");
        assert_eq!(unit.files.len(), 2);
        assert_eq!(unit.missing.len(), 1);
        assert_eq!(unit.missing[0].raw, "./Gone.sol");
    }

    #[test]
    fn test_self_import_is_a_cycle() {
        let mut tree = ProjectTree::new();
        tree.insert_path("Loop.sol", "import \"./Loop.sol\";").unwrap();

        let unit = assemble(&tree, "Loop.sol");
        assert!(unit.had_cycle);
        assert_eq!(unit.files.len(), 1);
    }

    #[test]
    fn test_folder_root_is_rejected() {
        let mut tree = ProjectTree::new();
        tree.insert_path("contracts/A.sol", "").unwrap();
        let folder = tree.find_by_path("contracts").unwrap();

        let index = ImportIndex::scan(&tree, &ImportExtractor::new());
        let graph = DependencyGraph::build(
            &tree,
            &index,
            &LibraryRegistry::builtin(),
            &PathResolver::default(),
        )
        .unwrap();

        let result = UnitAssembler::new(&tree, &graph).assemble(folder);
        assert!(matches!(result, Err(ResolverError::NotASourceFile(_))));
    }
}
