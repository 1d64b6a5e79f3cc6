//! Path resolution for Solidity imports
//!
//! `PathResolver` turns a relative import into a canonical project path.
//! `FileLocator` binds a canonical path to a file of the snapshot in two phases:
//! exact canonical path first, bare file name second.

use crate::{ResolverError, ResolverResult, is_relative};
use project::{FileId, ProjectTree};
use serde::{Deserialize, Serialize};

/// What to do when `../` climbs above the project root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootPolicy {
    /// Drop the excess `../` segments and keep going
    #[default]
    Lenient,
    /// Fail with `ResolverError::PathEscapesRoot`
    Strict,
}

/// Resolves import paths to canonical project paths
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver {
    policy: RootPolicy,
}

impl PathResolver {
    /// Create a new path resolver
    pub fn new(policy: RootPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RootPolicy {
        self.policy
    }

    /// Resolve `import_path` as written in the file at `from_path`
    ///
    /// Non-relative paths come back unchanged.
    pub fn resolve(&self, from_path: &str, import_path: &str) -> ResolverResult<String> {
        if !is_relative(import_path) {
            return Ok(import_path.to_string());
        }

        let mut stack: Vec<&str> = from_path.split('/').filter(|s| !s.is_empty()).collect();
        // The importing file's own name
        stack.pop();

        for segment in import_path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if stack.pop().is_none() {
                        match self.policy {
                            RootPolicy::Lenient => {
                                tracing::debug!(
                                    "Dropping '..' above project root in '{}' from {}",
                                    import_path,
                                    from_path
                                );
                            }
                            RootPolicy::Strict => {
                                return Err(ResolverError::PathEscapesRoot {
                                    import: import_path.to_string(),
                                    from: from_path.to_string(),
                                });
                            }
                        }
                    }
                }
                name => stack.push(name),
            }
        }

        Ok(stack.join("/"))
    }
}

/// Result of binding a canonical path to a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Canonical path match
    Exact(FileId),
    /// File-name match; `candidates` lists every match in tree order
    ByName {
        chosen: FileId,
        candidates: Vec<FileId>,
    },
    NotFound,
}

impl Lookup {
    pub fn file(&self) -> Option<FileId> {
        match self {
            Lookup::Exact(id) => Some(*id),
            Lookup::ByName { chosen, .. } => Some(*chosen),
            Lookup::NotFound => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Lookup::ByName { candidates, .. } if candidates.len() > 1)
    }
}

#[derive(Debug, Clone)]
struct LocatorEntry {
    id: FileId,
    path: String,
    name: String,
}

/// Two-phase file lookup over one snapshot
#[derive(Debug, Clone)]
pub struct FileLocator {
    entries: Vec<LocatorEntry>,
}

impl FileLocator {
    /// Index every file of the tree
    pub fn new(tree: &ProjectTree) -> ResolverResult<Self> {
        let entries = tree
            .files()
            .into_iter()
            .map(|file| {
                Ok(LocatorEntry {
                    id: file.id,
                    path: tree.canonical_path(file.id)?,
                    name: file.name.clone(),
                })
            })
            .collect::<ResolverResult<Vec<_>>>()?;

        Ok(Self { entries })
    }

    /// Bind a resolved path to a file
    pub fn locate(&self, resolved: &str) -> Lookup {
        let forms = path_forms(resolved);

        for form in &forms {
            if let Some(entry) = self.entries.iter().find(|e| &e.path == form) {
                return Lookup::Exact(entry.id);
            }
        }

        let candidates: Vec<FileId> = self
            .entries
            .iter()
            .filter(|e| forms.contains(&e.name))
            .map(|e| e.id)
            .collect();

        match candidates.first() {
            Some(&chosen) => Lookup::ByName { chosen, candidates },
            None => Lookup::NotFound,
        }
    }

    /// Canonical path of an indexed file
    pub fn path_of(&self, id: FileId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.path.as_str())
    }
}

/// The path as given plus its `.sol` counterpart
fn path_forms(resolved: &str) -> Vec<String> {
    let mut forms = vec![resolved.to_string()];
    match resolved.strip_suffix(".sol") {
        Some(stem) if !stem.is_empty() => forms.push(stem.to_string()),
        Some(_) => {}
        None => forms.push(format!("{}.sol", resolved)),
    }
    forms
}
