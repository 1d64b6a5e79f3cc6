//! Import resolution and compilation-unit assembly for Solidity Studio
//!
//! This crate provides the dependency engine behind the studio's project IDE:
//! - Import extraction from Solidity source text
//! - Classification of known external library imports
//! - Relative path resolution against the virtual project tree
//! - Dependency graph construction with missing/ambiguous import reporting
//! - Compilation-unit assembly with non-fatal cycle detection
//! - Content-hash change tracking for incremental rebuilds

pub mod engine;
pub mod extractor;
pub mod graph;
pub mod registry;
pub mod resolver;
pub mod tracker;
pub mod unit;

pub use engine::ResolutionEngine;
pub use extractor::{ImportExtractor, ImportIndex};
pub use graph::DependencyGraph;
pub use registry::{ExternalLibraryReference, LibraryInfo, LibraryRegistry};
pub use resolver::{FileLocator, Lookup, PathResolver, RootPolicy};
pub use tracker::{ChangeTracker, IncrementalGraph};
pub use unit::{CompilationUnit, UnitAssembler};

use project::FileId;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during import resolution
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Import '{import}' in '{from}' escapes the project root")]
    PathEscapesRoot { import: String, from: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("File {0} is not part of the project")]
    UnknownFile(FileId),

    #[error("{0} is a folder, not a source file")]
    NotASourceFile(String),

    #[error("Project error: {0}")]
    Project(#[from] project::ProjectError),
}

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Represents an imported symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedSymbol {
    /// Name of the symbol in the source file
    pub name: String,
    /// Alias for the symbol (for "import {X as Y}")
    pub alias: Option<String>,
}

/// Types of Solidity import statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ImportKind {
    /// Simple import: `import "path";`
    Simple,
    /// Named imports: `import {A, B} from "path";`
    Named(Vec<ImportedSymbol>),
    /// Aliased import: `import "path" as X;`
    Aliased(String),
    /// Wildcard import: `import * as X from "path";`
    Wildcard(String),
}

/// Represents a parsed import statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    /// The import path as written in source
    pub path: String,
    /// Type of import
    pub kind: ImportKind,
    /// Line on which the statement starts
    pub line: usize,
}

impl Import {
    /// `./` and `../` imports always address project files
    pub fn is_relative(&self) -> bool {
        is_relative(&self.path)
    }
}

pub(crate) fn is_relative(path: &str) -> bool {
    path.starts_with("./") || path.starts_with("../")
}

/// Where an import statement points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "lowercase")]
pub enum ImportTarget {
    /// A file of the project
    File(FileId),
    /// A known external library, identified by its prefix
    External(String),
    /// Nothing matched
    Unresolved,
}

/// A single import statement and where it resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEdge {
    pub source: FileId,
    pub raw: String,
    pub target: ImportTarget,
}

/// An internal-looking import that matches no project file and no known library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingImport {
    pub source: FileId,
    /// Canonical path of the importing file
    pub source_path: String,
    /// Import path as written
    pub raw: String,
    /// Why resolution failed, when it failed for a reason other than "no match"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An import resolved only by bare file name, with more than one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousImport {
    pub source: FileId,
    pub source_path: String,
    pub raw: String,
    /// Canonical path of the file the import was bound to
    pub chosen: String,
    /// Every file whose name matched, in tree order
    pub candidates: Vec<String>,
}
