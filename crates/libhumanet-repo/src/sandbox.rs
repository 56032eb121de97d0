//! Path sandbox for idea repositories
//!
//! Every logical path handed to the store is normalized here and mapped onto
//! a physical path below `<storage_root>/<ideaId>/`. Resolution is lexical
//! first (no `..` may climb above the root). Existing components may not be
//! symlinks, so a logical path always names exactly one physical entry and
//! required-file and `.versions` checks cannot be sidestepped through an
//! alias. The result is checked once more against the canonicalized root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::RepoError;
use crate::types::IdeaId;
use crate::versions::VERSIONS_DIR;

/// A logical path together with its physical location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Normalized `/`-separated path relative to the repository root
    pub logical: String,
    /// Absolute or storage-root-relative location on disk
    pub physical: PathBuf,
}

impl ResolvedPath {
    /// Whether this is the repository root itself
    pub fn is_root(&self) -> bool {
        self.logical.is_empty()
    }
}

/// Maps idea-relative paths onto the storage root
#[derive(Debug, Clone)]
pub struct Sandbox {
    storage_root: PathBuf,
}

impl Sandbox {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Root directory of an idea's repository
    pub fn repo_root(&self, idea: &IdeaId) -> PathBuf {
        self.storage_root.join(idea.as_str())
    }

    /// Resolve a path that must name something below the root
    pub fn resolve(&self, idea: &IdeaId, logical: &str) -> Result<ResolvedPath, RepoError> {
        let resolved = self.resolve_dir(idea, logical)?;
        if resolved.is_root() {
            return Err(RepoError::traversal(logical));
        }
        Ok(resolved)
    }

    /// Resolve a path that may also be empty, meaning the root itself
    pub fn resolve_dir(&self, idea: &IdeaId, logical: &str) -> Result<ResolvedPath, RepoError> {
        let segments = normalize(logical)?;
        let root = self.repo_root(idea);

        let mut physical = root.clone();
        for segment in &segments {
            physical.push(segment);
        }

        reject_symlinks(&root, &segments).map_err(|_| RepoError::traversal(logical))?;
        verify_contained(&root, &physical).map_err(|_| RepoError::traversal(logical))?;

        Ok(ResolvedPath {
            logical: segments.join("/"),
            physical,
        })
    }
}

/// Normalize a logical path into its segments.
///
/// Accepts `/` and `\` as separators, drops `.` segments and applies `..`
/// against the segments seen so far. Fails on absolute paths, encoded
/// separators or dots, NUL bytes, doubled separators, `..` above the root
/// and on the reserved history directory.
pub fn normalize(logical: &str) -> Result<Vec<String>, RepoError> {
    let reject = || RepoError::traversal(logical);

    if logical.contains('\0') {
        return Err(reject());
    }

    let lowered = logical.to_ascii_lowercase();
    if ["%2f", "%5c", "%2e", "%00"].iter().any(|enc| lowered.contains(enc)) {
        return Err(reject());
    }

    if logical.starts_with('/') || logical.starts_with('\\') || has_drive_prefix(logical) {
        return Err(reject());
    }

    let trimmed = logical
        .strip_suffix('/')
        .or_else(|| logical.strip_suffix('\\'))
        .unwrap_or(logical);

    let mut segments: Vec<String> = Vec::new();
    if trimmed.is_empty() {
        return Ok(segments);
    }

    for segment in trimmed.split(['/', '\\']) {
        match segment {
            "" => return Err(reject()),
            "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(reject());
                }
            }
            other => segments.push(other.to_string()),
        }
    }

    if segments.first().map(String::as_str) == Some(VERSIONS_DIR) {
        return Err(reject());
    }

    Ok(segments)
}

fn has_drive_prefix(logical: &str) -> bool {
    let bytes = logical.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Fail if any existing component below `root` is a symlink.
///
/// Stops at the first component that cannot be stat'ed; nothing below it
/// exists.
fn reject_symlinks(root: &Path, segments: &[String]) -> io::Result<()> {
    let mut current = root.to_path_buf();
    for segment in segments {
        current.push(segment);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "symbolic link in repository path",
                ));
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Ok(())
}

/// Check that `candidate` stays below `root` once symlinks are resolved.
///
/// Only the deepest existing ancestor of `candidate` is canonicalized; the
/// rest are plain segments that cannot climb. A missing root means nothing
/// below it can be a link, so the lexical result stands.
fn verify_contained(root: &Path, candidate: &Path) -> io::Result<()> {
    let canonical_root = match fs::canonicalize(root) {
        Ok(path) => path,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let existing = candidate
        .ancestors()
        .find(|p| fs::symlink_metadata(p).is_ok())
        .unwrap_or(root);

    let canonical = fs::canonicalize(existing)?;
    if canonical.starts_with(&canonical_root) {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "path resolves outside repository root",
        ))
    }
}
