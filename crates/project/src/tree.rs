//! Virtual project file tree
//!
//! A snapshot of the studio's in-memory file system. Folders form a rooted,
//! ordered tree; names are unique among siblings. Canonical paths are derived by
//! walking parent references and are recomputed on every call, so they always
//! reflect the current shape of the tree.

use crate::{ProjectError, ProjectResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Opaque identity of a file or folder in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(u32);

impl FileId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

/// A single entry of the project tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub id: FileId,
    pub name: String,
    pub kind: FileKind,
    /// Source text (files only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Containing folder, `None` for entries at the project root
    #[serde(default)]
    pub parent: Option<FileId>,
    /// Ordered children (folders only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileId>,
}

impl ProjectFile {
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }

    /// Source text, empty for folders and files without content
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Ordered snapshot of the project file system
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectTree {
    nodes: BTreeMap<FileId, ProjectFile>,
    roots: Vec<FileId>,
    next_id: u32,
}

impl ProjectTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from the flat record list handed over by the file-system store
    pub fn from_records(records: Vec<ProjectFile>) -> ProjectResult<Self> {
        let mut nodes = BTreeMap::new();
        let mut roots = Vec::new();

        for record in records {
            if record.parent.is_none() {
                roots.push(record.id);
            }
            let id = record.id;
            if nodes.insert(id, record).is_some() {
                return Err(ProjectError::InvalidStructure(format!(
                    "duplicate file id {}",
                    id
                )));
            }
        }

        let next_id = nodes.keys().map(|id| id.raw() + 1).max().unwrap_or(0);
        let tree = Self {
            nodes,
            roots,
            next_id,
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Parse a JSON snapshot (an array of records)
    pub fn from_json(json: &str) -> ProjectResult<Self> {
        let records: Vec<ProjectFile> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    /// Serialize the tree as a JSON snapshot
    pub fn to_json(&self) -> ProjectResult<String> {
        Ok(serde_json::to_string_pretty(&self.records())?)
    }

    /// All records in tree order
    pub fn records(&self) -> Vec<ProjectFile> {
        self.walk().into_iter().cloned().collect()
    }

    fn validate(&self) -> ProjectResult<()> {
        for node in self.nodes.values() {
            if node.name.is_empty() || node.name.contains('/') {
                return Err(ProjectError::InvalidName(node.name.clone()));
            }
            if node.is_folder() && node.content.is_some() {
                return Err(ProjectError::InvalidStructure(format!(
                    "folder '{}' carries content",
                    node.name
                )));
            }
            if node.is_file() && !node.children.is_empty() {
                return Err(ProjectError::InvalidStructure(format!(
                    "file '{}' has children",
                    node.name
                )));
            }

            if let Some(parent_id) = node.parent {
                let parent = self.file(parent_id)?;
                if !parent.is_folder() {
                    return Err(ProjectError::NotAFolder(parent_id));
                }
                if !parent.children.contains(&node.id) {
                    return Err(ProjectError::InvalidStructure(format!(
                        "{} is not listed among the children of {}",
                        node.id, parent_id
                    )));
                }
            }

            for child_id in &node.children {
                if self.file(*child_id)?.parent != Some(node.id) {
                    return Err(ProjectError::InvalidStructure(format!(
                        "child {} of {} points to a different parent",
                        child_id, node.id
                    )));
                }
            }

            self.check_unique_siblings(&node.children, &node.name)?;
        }

        self.check_unique_siblings(&self.roots, "project root")?;

        // Every entry must hang off a root; anything left over sits on a parent cycle.
        if self.walk().len() != self.nodes.len() {
            return Err(ProjectError::InvalidStructure(
                "folder structure contains a cycle".to_string(),
            ));
        }

        Ok(())
    }

    fn check_unique_siblings(&self, siblings: &[FileId], location: &str) -> ProjectResult<()> {
        let mut seen = HashSet::new();
        for id in siblings {
            let name = &self.file(*id)?.name;
            if !seen.insert(name.as_str()) {
                return Err(ProjectError::DuplicateName {
                    name: name.clone(),
                    location: location.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Add a folder under `parent` (or at the root)
    pub fn add_folder(&mut self, parent: Option<FileId>, name: &str) -> ProjectResult<FileId> {
        self.insert(parent, name, FileKind::Folder, None)
    }

    /// Add a file under `parent` (or at the root)
    pub fn add_file(
        &mut self,
        parent: Option<FileId>,
        name: &str,
        content: impl Into<String>,
    ) -> ProjectResult<FileId> {
        self.insert(parent, name, FileKind::File, Some(content.into()))
    }

    /// Add a file at a `/`-separated path, creating missing folders on the way
    pub fn insert_path(&mut self, path: &str, content: impl Into<String>) -> ProjectResult<FileId> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file_name, folders)) = segments.split_last() else {
            return Err(ProjectError::InvalidName(path.to_string()));
        };

        let mut parent = None;
        for folder in folders {
            parent = Some(match self.child_named(parent, folder) {
                Some(existing) if self.nodes[&existing].is_folder() => existing,
                Some(existing) => return Err(ProjectError::NotAFolder(existing)),
                None => self.add_folder(parent, folder)?,
            });
        }

        self.add_file(parent, file_name, content)
    }

    fn insert(
        &mut self,
        parent: Option<FileId>,
        name: &str,
        kind: FileKind,
        content: Option<String>,
    ) -> ProjectResult<FileId> {
        if name.is_empty() || name.contains('/') {
            return Err(ProjectError::InvalidName(name.to_string()));
        }

        if let Some(parent_id) = parent {
            if !self.file(parent_id)?.is_folder() {
                return Err(ProjectError::NotAFolder(parent_id));
            }
        }

        if self.child_named(parent, name).is_some() {
            let location = match parent {
                Some(parent_id) => self.canonical_path(parent_id)?,
                None => "project root".to_string(),
            };
            return Err(ProjectError::DuplicateName {
                name: name.to_string(),
                location,
            });
        }

        let id = FileId::new(self.next_id);
        self.next_id += 1;

        self.nodes.insert(
            id,
            ProjectFile {
                id,
                name: name.to_string(),
                kind,
                content,
                parent,
                children: Vec::new(),
            },
        );

        match parent {
            Some(parent_id) => {
                if let Some(folder) = self.nodes.get_mut(&parent_id) {
                    folder.children.push(id);
                }
            }
            None => self.roots.push(id),
        }

        Ok(id)
    }

    /// Replace the content of a file
    pub fn set_content(&mut self, id: FileId, content: impl Into<String>) -> ProjectResult<()> {
        let node = self.nodes.get_mut(&id).ok_or(ProjectError::UnknownFile(id))?;
        if !node.is_file() {
            return Err(ProjectError::InvalidStructure(format!(
                "cannot set content on folder '{}'",
                node.name
            )));
        }
        node.content = Some(content.into());
        Ok(())
    }

    /// Rename an entry, keeping sibling names unique
    pub fn rename(&mut self, id: FileId, name: &str) -> ProjectResult<()> {
        if name.is_empty() || name.contains('/') {
            return Err(ProjectError::InvalidName(name.to_string()));
        }
        let parent = self.file(id)?.parent;
        if let Some(existing) = self.child_named(parent, name) {
            if existing != id {
                return Err(ProjectError::DuplicateName {
                    name: name.to_string(),
                    location: match parent {
                        Some(parent_id) => self.canonical_path(parent_id)?,
                        None => "project root".to_string(),
                    },
                });
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.name = name.to_string();
        }
        Ok(())
    }

    fn child_named(&self, parent: Option<FileId>, name: &str) -> Option<FileId> {
        let siblings = match parent {
            Some(parent_id) => &self.nodes.get(&parent_id)?.children,
            None => &self.roots,
        };
        siblings
            .iter()
            .copied()
            .find(|id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }

    /// Look up an entry
    pub fn get(&self, id: FileId) -> Option<&ProjectFile> {
        self.nodes.get(&id)
    }

    /// Look up an entry, failing on unknown ids
    pub fn file(&self, id: FileId) -> ProjectResult<&ProjectFile> {
        self.nodes.get(&id).ok_or(ProjectError::UnknownFile(id))
    }

    /// Top-level entries in order
    pub fn roots(&self) -> &[FileId] {
        &self.roots
    }

    /// Every entry in pre-order, children in their stored order
    pub fn walk(&self) -> Vec<&ProjectFile> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<FileId> = self.roots.iter().rev().copied().collect();
        let mut seen = HashSet::new();

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            out.push(node);
            stack.extend(node.children.iter().rev().copied());
        }

        out
    }

    /// Files (not folders) in tree order
    pub fn files(&self) -> Vec<&ProjectFile> {
        self.walk().into_iter().filter(|n| n.is_file()).collect()
    }

    /// The `/`-joined path from the project root to `id`
    pub fn canonical_path(&self, id: FileId) -> ProjectResult<String> {
        let mut segments = Vec::new();
        let mut current = Some(id);

        while let Some(node_id) = current {
            if segments.len() > self.nodes.len() {
                return Err(ProjectError::InvalidStructure(
                    "folder structure contains a cycle".to_string(),
                ));
            }
            let node = self.file(node_id)?;
            segments.push(node.name.as_str());
            current = node.parent;
        }

        segments.reverse();
        Ok(segments.join("/"))
    }

    /// Canonical paths of every file in tree order
    pub fn canonical_paths(&self) -> ProjectResult<Vec<(FileId, String)>> {
        self.files()
            .into_iter()
            .map(|file| Ok((file.id, self.canonical_path(file.id)?)))
            .collect()
    }

    /// Find an entry by canonical path
    pub fn find_by_path(&self, path: &str) -> Option<FileId> {
        let mut parent = None;
        let mut found = None;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            found = Some(self.child_named(parent, segment)?);
            parent = found;
        }
        found
    }

    /// Number of entries (files and folders)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
