//! End-to-end resolution over realistic project snapshots

use project::{Project, ProjectTree};
use resolver::{
    ImportTarget, LibraryInfo, LibraryRegistry, ResolutionEngine, ResolverError, RootPolicy,
};
use std::fs;
use tempfile::TempDir;

fn known_registry() -> LibraryRegistry {
    LibraryRegistry::new(vec![LibraryInfo::new(
        "@known/",
        "Known Security",
        "https://docs.example.org/known",
        "Security primitives",
    )])
}

#[test]
fn test_files_without_imports_have_none() {
    let mut tree = ProjectTree::new();
    let id = tree
        .insert_path("contracts/Plain.sol", "pragma solidity ^0.8.19;\ncontract Plain {}")
        .unwrap();
    tree.insert_path("contracts/Empty.sol", "").unwrap();

    let engine = ResolutionEngine::default();
    for file in tree.files() {
        assert!(engine.imports_for(file).is_empty(), "{} has imports", file.name);
    }
    assert!(engine.imports_for(tree.file(id).unwrap()).is_empty());
}

#[test]
fn test_resolve_import_relative_forms() {
    let engine = ResolutionEngine::default();
    assert_eq!(engine.resolve_import("a/b/C.sol", "./D.sol").unwrap(), "a/b/D.sol");
    assert_eq!(engine.resolve_import("a/b/C.sol", "../E.sol").unwrap(), "a/E.sol");
}

#[test]
fn test_mutual_import_unit_terminates() {
    let mut tree = ProjectTree::new();
    let a = tree
        .insert_path("A.sol", "import \"./B.sol\";\ncontract A {}")
        .unwrap();
    tree.insert_path("B.sol", "import \"./A.sol\";\ncontract B {}")
        .unwrap();

    let unit = ResolutionEngine::default()
        .assemble_compilation_unit(a, &tree)
        .unwrap();
    assert!(unit.had_cycle);
    assert_eq!(
        unit.files.keys().collect::<Vec<_>>(),
        vec!["A.sol", "B.sol"]
    );
}

#[test]
fn test_shared_library_prefix_listed_once() {
    let mut tree = ProjectTree::new();
    let a = tree
        .insert_path(
            "A.sol",
            "import \"@known/Security.sol\";\nimport {Guard} from \"@known/guards/Guard.sol\";",
        )
        .unwrap();
    tree.insert_path("B.sol", "import \"@known/Security.sol\";")
        .unwrap();

    let engine = ResolutionEngine::new(known_registry(), RootPolicy::Lenient);
    let unit = engine.assemble_compilation_unit(a, &tree).unwrap();
    assert_eq!(
        unit.external_libraries.into_iter().collect::<Vec<_>>(),
        vec!["@known/".to_string()]
    );
    assert_eq!(unit.external_imports.len(), 2);
}

#[test]
fn test_missing_import_has_no_edge() {
    let mut tree = ProjectTree::new();
    let a = tree.insert_path("A.sol", "import \"./Missing.sol\";").unwrap();

    let graph = ResolutionEngine::default()
        .build_dependency_graph(&tree)
        .unwrap();
    assert_eq!(graph.missing_paths(), vec!["./Missing.sol"]);
    assert!(graph.dependencies(a).is_empty());
    assert_eq!(graph.imports_of(a)[0].target, ImportTarget::Unresolved);
}

#[test]
fn test_import_text_in_string_constant_is_not_missing() {
    let mut tree = ProjectTree::new();
    let main = tree
        .insert_path(
            "Main.sol",
            "import \"./Real.sol\";\ncontract Main { string constant S = \"import 'Fake.sol';\"; }",
        )
        .unwrap();
    tree.insert_path("Real.sol", "contract Real {}").unwrap();

    let graph = ResolutionEngine::default().build_dependency_graph(&tree).unwrap();
    assert!(graph.missing().is_empty());
    assert_eq!(graph.imports_of(main).len(), 1);
    assert_eq!(graph.dependencies(main).len(), 1);
}

#[test]
fn test_rebuild_is_deterministic() {
    let mut tree = ProjectTree::new();
    tree.insert_path(
        "src/Main.sol",
        "import \"./Lib.sol\";\nimport \"@openzeppelin/contracts/access/Ownable.sol\";\nimport \"./Gone.sol\";",
    )
    .unwrap();
    tree.insert_path("src/Lib.sol", "import \"../shared/Math.sol\";")
        .unwrap();
    tree.insert_path("shared/Math.sol", "library Math {}").unwrap();

    let engine = ResolutionEngine::default();
    let first = engine.build_dependency_graph(&tree).unwrap();
    let second = engine.build_dependency_graph(&tree).unwrap();

    assert_eq!(first.adjacency(), second.adjacency());
    assert_eq!(first.external(), second.external());
    assert_eq!(first.missing(), second.missing());
    assert_eq!(first.report(), second.report());
}

#[test]
fn test_main_lib_scenario() {
    let mut tree = ProjectTree::new();
    let main = tree
        .insert_path("Main.sol", "import \"./Lib.sol\";\ncontract Main {}")
        .unwrap();
    tree.insert_path("Lib.sol", "import \"@known/Security.sol\";\nlibrary Lib {}")
        .unwrap();
    tree.insert_path("Unused.sol", "contract Unused {}").unwrap();

    let engine = ResolutionEngine::new(known_registry(), RootPolicy::Lenient);
    let unit = engine.assemble_compilation_unit(main, &tree).unwrap();

    assert_eq!(unit.files.len(), 2);
    assert!(unit.files.contains_key("Main.sol"));
    assert!(unit.files.contains_key("Lib.sol"));
    assert_eq!(unit.external_libraries.len(), 1);
    assert!(!unit.had_cycle);
    assert_eq!(unit.source_order(), &["Lib.sol", "Main.sol"]);
}

#[test]
fn test_root_escape_policies() {
    let mut tree = ProjectTree::new();
    let main = tree.insert_path("Main.sol", "import \"../Lib.sol\";").unwrap();
    tree.insert_path("Lib.sol", "library Lib {}").unwrap();

    // Lenient: the excess `../` is dropped and the import binds to Lib.sol
    let lenient = ResolutionEngine::new(LibraryRegistry::builtin(), RootPolicy::Lenient);
    let graph = lenient.build_dependency_graph(&tree).unwrap();
    assert_eq!(graph.dependencies(main).len(), 1);
    assert!(graph.missing().is_empty());

    // Strict: the resolver fails, the graph reports the import as missing
    let strict = ResolutionEngine::new(LibraryRegistry::builtin(), RootPolicy::Strict);
    assert!(matches!(
        strict.resolve_import("Main.sol", "../Lib.sol"),
        Err(ResolverError::PathEscapesRoot { .. })
    ));
    let graph = strict.build_dependency_graph(&tree).unwrap();
    assert!(graph.dependencies(main).is_empty());
    assert_eq!(graph.missing().len(), 1);
    assert!(graph.missing()[0].reason.is_some());
}

#[test]
fn test_ambiguous_name_fallback_is_reported() {
    let mut tree = ProjectTree::new();
    let main = tree
        .insert_path("app/Main.sol", "import \"Errors.sol\";")
        .unwrap();
    let first = tree.insert_path("core/Errors.sol", "").unwrap();
    tree.insert_path("periphery/Errors.sol", "").unwrap();

    let graph = ResolutionEngine::default()
        .build_dependency_graph(&tree)
        .unwrap();
    assert_eq!(graph.dependencies(main), &[first]);
    assert_eq!(graph.ambiguous().len(), 1);
    assert_eq!(
        graph.ambiguous()[0].candidates,
        vec!["core/Errors.sol", "periphery/Errors.sol"]
    );
}

#[test]
fn test_incremental_refresh_tracks_edits() {
    let mut tree = ProjectTree::new();
    let main = tree
        .insert_path("src/Main.sol", "import \"./Lib.sol\";")
        .unwrap();
    let lib = tree.insert_path("src/Lib.sol", "library Lib {}").unwrap();

    let engine = ResolutionEngine::default();
    let mut incremental = engine.incremental();
    assert_eq!(incremental.refresh(&tree).unwrap().dependencies(main), &[lib]);

    tree.set_content(lib, "import \"./Main.sol\";\nlibrary Lib {}")
        .unwrap();
    let graph = incremental.refresh(&tree).unwrap();
    assert!(graph.has_cycles());
    assert!(graph.topological_order().is_err());
    assert_eq!(incremental.generation(), 2);
}

#[test]
fn test_project_loaded_from_disk() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("foundry.toml"), "[profile.default]\n").unwrap();
    fs::create_dir_all(root.join("src/tokens")).unwrap();
    fs::write(
        root.join("src/Vault.sol"),
        "import {Token} from \"./tokens/Token.sol\";\ncontract Vault {}",
    )
    .unwrap();
    fs::write(
        root.join("src/tokens/Token.sol"),
        "import \"@openzeppelin/contracts/token/ERC20/ERC20.sol\";\ncontract Token {}",
    )
    .unwrap();

    let project = Project::load(root).unwrap();
    let vault = project.tree().find_by_path("src/Vault.sol").unwrap();
    let unit = ResolutionEngine::default()
        .assemble_compilation_unit(vault, project.tree())
        .unwrap();

    assert_eq!(unit.entry_path, "src/Vault.sol");
    assert_eq!(unit.source_order(), &["src/tokens/Token.sol", "src/Vault.sol"]);
    assert!(unit.external_libraries.contains("@openzeppelin/contracts/"));
}

#[test]
fn test_graph_report_serializes() {
    let mut tree = ProjectTree::new();
    tree.insert_path("Main.sol", "import \"./Lib.sol\";").unwrap();
    tree.insert_path("Lib.sol", "").unwrap();

    let graph = ResolutionEngine::default()
        .build_dependency_graph(&tree)
        .unwrap();
    let json = serde_json::to_value(graph.report()).unwrap();
    assert_eq!(json["files"][0]["path"], "Main.sol");
    assert_eq!(json["has_cycles"], false);
}
