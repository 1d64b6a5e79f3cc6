//! Solidity file discovery for projects on disk
//!
//! Walks the framework's source directory and turns the `.sol` files found there
//! into a `ProjectTree` rooted at the project directory.

use crate::detector::Framework;
use crate::tree::ProjectTree;
use crate::{ProjectError, ProjectResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Project file discovery
pub struct ProjectDiscovery<'a> {
    root: &'a Path,
    framework: Framework,
}

impl<'a> ProjectDiscovery<'a> {
    /// Create a new project discovery instance
    pub fn new(root: &'a Path, framework: Framework) -> Self {
        Self { root, framework }
    }

    fn source_dir(&self) -> PathBuf {
        match self.framework.source_dir() {
            "." => self.root.to_path_buf(),
            dir => self.root.join(dir),
        }
    }

    /// Discover all Solidity files in the project, sorted
    pub fn discover_solidity_files(&self) -> ProjectResult<Vec<PathBuf>> {
        let mut source_dir = self.source_dir();
        if !source_dir.exists() {
            tracing::warn!(
                "Source directory {:?} not found, searching project root",
                source_dir
            );
            source_dir = self.root.to_path_buf();
        }

        let exclude_dirs = self.framework.excluded_dirs();
        tracing::debug!("Discovering Solidity files in: {:?}", source_dir);
        tracing::debug!("Excluding directories: {:?}", exclude_dirs);

        let mut solidity_files = Vec::new();
        for entry in WalkDir::new(&source_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Never exclude the directory being searched
                e.path() == source_dir.as_path() || !should_exclude(e.path(), exclude_dirs)
            })
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "sol") {
                solidity_files.push(path.to_path_buf());
            }
        }

        solidity_files.sort();
        Ok(solidity_files)
    }

    /// Read every discovered file into a snapshot keyed by its path below the root
    pub fn load_tree(&self) -> ProjectResult<ProjectTree> {
        let mut tree = ProjectTree::new();

        for file in self.discover_solidity_files()? {
            let relative = file.strip_prefix(self.root).map_err(|_| {
                ProjectError::InvalidStructure(format!(
                    "{} lies outside the project root",
                    file.display()
                ))
            })?;
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let content = std::fs::read_to_string(&file)?;
            tree.insert_path(&path, content)?;
        }

        Ok(tree)
    }
}

fn should_exclude(path: &Path, exclude_dirs: &[&str]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy();

    (name.starts_with('.') && name != "." && name != "..")
        || exclude_dirs.contains(&name.as_ref())
        || name == "node_modules"
}

impl From<walkdir::Error> for ProjectError {
    fn from(err: walkdir::Error) -> Self {
        ProjectError::Io(std::io::Error::other(err.to_string()))
    }
}
