//! Directory listings and depth-bounded trees

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::RepoError;
use crate::types::{EntryKind, FileEntry, FileTreeNode};
use crate::versions::VERSIONS_DIR;

/// Aggregate counts over a produced tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    /// Files anywhere in the tree
    pub file_count: usize,
    /// Directories in the tree, not counting the tree's own root
    pub directory_count: usize,
    /// Required files that appear in the tree
    pub required_present: usize,
    /// Size of the required-file manifest
    pub required_total: usize,
    /// Sum of file sizes in bytes
    pub total_size: u64,
}

impl TreeStats {
    /// Count over a tree; only nodes present in `tree` are considered
    pub fn from_tree(tree: &FileTreeNode, required: &[&str]) -> Self {
        let mut stats = TreeStats {
            required_total: required.len(),
            ..Default::default()
        };
        if let Some(children) = &tree.children {
            for child in children {
                stats.visit(child, required);
            }
        }
        stats
    }

    fn visit(&mut self, node: &FileTreeNode, required: &[&str]) {
        match node.kind {
            EntryKind::File => {
                self.file_count += 1;
                self.total_size += node.size;
                if required.contains(&node.path.as_str()) {
                    self.required_present += 1;
                }
            }
            EntryKind::Directory => {
                self.directory_count += 1;
                if let Some(children) = &node.children {
                    for child in children {
                        self.visit(child, required);
                    }
                }
            }
        }
    }
}

/// Whether a directory entry is internal bookkeeping hidden from listings
fn is_hidden(name: &str, parent_logical: &str) -> bool {
    parent_logical.is_empty() && name == VERSIONS_DIR
}

fn join_logical(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// List one directory level, directories first, then by name
pub fn list_dir(physical: &Path, logical: &str) -> Result<Vec<FileEntry>, RepoError> {
    let mut entries = Vec::new();
    for dirent in fs::read_dir(physical)? {
        let dirent = dirent?;
        let name = match dirent.file_name().into_string() {
            Ok(name) => name,
            // Names that are not UTF-8 cannot be addressed by logical paths
            Err(_) => continue,
        };
        if is_hidden(&name, logical) {
            continue;
        }
        // Links are never listed or walked
        if dirent.file_type()?.is_symlink() {
            continue;
        }
        let meta = dirent.metadata()?;
        let path = join_logical(logical, &name);
        entries.push(FileEntry::from_metadata(name, path, &meta));
    }

    entries.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(entries)
}

/// Build a tree rooted at `physical`.
///
/// The root is depth 0. Directories shallower than `max_depth` get their
/// children filled in; directories at the cutoff are listed without
/// children.
pub fn build_tree(physical: &Path, logical: &str, max_depth: usize) -> Result<FileTreeNode, RepoError> {
    let meta = fs::metadata(physical)?;
    let name = if logical.is_empty() {
        String::new()
    } else {
        logical.rsplit('/').next().unwrap_or(logical).to_string()
    };
    let mut root = FileEntry::from_metadata(name, logical.to_string(), &meta);
    if root.is_dir() {
        expand(&mut root, physical, 0, max_depth)?;
    }
    Ok(root)
}

fn expand(node: &mut FileTreeNode, physical: &Path, depth: usize, max_depth: usize) -> Result<(), RepoError> {
    if depth >= max_depth {
        return Ok(());
    }
    let mut children = list_dir(physical, &node.path)?;
    for child in children.iter_mut().filter(|c| c.is_dir()) {
        let child_physical = physical.join(&child.name);
        expand(child, &child_physical, depth + 1, max_depth)?;
    }
    node.children = Some(children);
    Ok(())
}
