//! Project snapshot support for Solidity Studio
//!
//! This crate provides the read-only view of a project that the resolution engine
//! works on, including:
//! - The virtual file tree (`ProjectTree`) and canonical path derivation
//! - JSON snapshots exchanged with the file-system store
//! - Framework detection and loading a snapshot from a directory on disk

pub mod detector;
pub mod discovery;
pub mod tree;

pub use detector::{Framework, detect_framework};
pub use discovery::ProjectDiscovery;
pub use tree::{FileId, FileKind, ProjectFile, ProjectTree};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while building or reading a project snapshot
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Unknown file id {0}")]
    UnknownFile(FileId),

    #[error("Name '{name}' already exists in {location}")]
    DuplicateName { name: String, location: String },

    #[error("File {0} is not a folder")]
    NotAFolder(FileId),

    #[error("Invalid file name: '{0}'")]
    InvalidName(String),

    #[error("Invalid project structure: {0}")]
    InvalidStructure(String),

    #[error("No Solidity files found in project")]
    NoSolidityFiles,
}

/// Result type for project operations
pub type ProjectResult<T> = Result<T, ProjectError>;

/// A project loaded from disk together with its snapshot
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project
    pub root: PathBuf,
    /// Detected framework type
    pub framework: Framework,
    /// Snapshot of the Solidity sources
    pub tree: ProjectTree,
}

impl Project {
    /// Load a project from the given path
    pub fn load(path: impl AsRef<Path>) -> ProjectResult<Self> {
        let root = path.as_ref().to_path_buf();

        if !root.exists() {
            return Err(ProjectError::InvalidStructure(format!(
                "Project path does not exist: {}",
                root.display()
            )));
        }

        let framework = detect_framework(&root);
        tracing::info!("Detected framework: {}", framework);

        let discovery = ProjectDiscovery::new(&root, framework);
        let tree = discovery.load_tree()?;

        if tree.files().is_empty() {
            return Err(ProjectError::NoSolidityFiles);
        }

        tracing::info!("Loaded {} Solidity files", tree.files().len());

        Ok(Self {
            root,
            framework,
            tree,
        })
    }

    /// Load a project from a JSON snapshot produced by the file-system store
    pub fn from_snapshot(path: impl AsRef<Path>) -> ProjectResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tree = ProjectTree::from_json(&json)?;

        Ok(Self {
            root: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            framework: Framework::Plain,
            tree,
        })
    }

    /// Get the root directory of the project
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the project snapshot
    pub fn tree(&self) -> &ProjectTree {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_project() {
        let result = Project::load("/definitely/not/a/project");
        assert!(matches!(result, Err(ProjectError::InvalidStructure(_))));
    }

    #[test]
    fn test_load_empty_project() {
        let temp = TempDir::new().unwrap();
        let result = Project::load(temp.path());
        assert!(matches!(result, Err(ProjectError::NoSolidityFiles)));
    }

    #[test]
    fn test_load_snapshot_file() {
        let temp = TempDir::new().unwrap();
        let mut tree = ProjectTree::new();
        tree.insert_path("contracts/Token.sol", "contract Token {}")
            .unwrap();
        let snapshot = temp.path().join("snapshot.json");
        std::fs::write(&snapshot, tree.to_json().unwrap()).unwrap();

        let project = Project::from_snapshot(&snapshot).unwrap();
        assert_eq!(project.framework, Framework::Plain);
        assert!(project.tree().find_by_path("contracts/Token.sol").is_some());
    }
}
