//! Repository file store
//!
//! [`RepoStore`] is the entry point used by callers. Every operation parses
//! the idea id, resolves paths through the [`Sandbox`] before touching the
//! disk, takes the per-idea lock (exclusive for mutations, shared for reads)
//! and only then performs I/O.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::RepoError;
use crate::fsutil::write_atomic;
use crate::lock::{LockMode, RepoLock};
use crate::sandbox::{ResolvedPath, Sandbox};
use crate::template::{self, all_required_paths, RepoMeta, Template};
use crate::tree::{self, TreeStats};
use crate::types::{FileEntry, FileTreeNode, FileVersion, IdeaId, VersionOperation};
use crate::versions::VersionManager;

/// Main storage interface for idea repositories
#[derive(Debug, Clone)]
pub struct RepoStore {
    config: StorageConfig,
    sandbox: Sandbox,
}

impl RepoStore {
    pub fn new(config: StorageConfig) -> Self {
        let sandbox = Sandbox::new(config.storage_root.clone());
        Self { config, sandbox }
    }

    /// Store over `storage_root` with default settings
    pub fn open(storage_root: impl Into<PathBuf>) -> Self {
        Self::new(StorageConfig::with_root(storage_root))
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Root directory of an idea's repository
    pub fn repo_root(&self, idea_id: &str) -> Result<PathBuf, RepoError> {
        Ok(self.sandbox.repo_root(&IdeaId::parse(idea_id)?))
    }

    pub(crate) fn lock(&self, idea: &IdeaId, mode: LockMode) -> Result<RepoLock, RepoError> {
        RepoLock::acquire(
            self.sandbox.storage_root(),
            idea,
            mode,
            Duration::from_millis(self.config.lock_timeout_ms),
        )
    }

    fn require_repo(&self, idea: &IdeaId) -> Result<PathBuf, RepoError> {
        let root = self.sandbox.repo_root(idea);
        if root.is_dir() {
            Ok(root)
        } else {
            Err(RepoError::RepositoryNotFound(idea.to_string()))
        }
    }

    /// Scaffold a new repository from a template.
    ///
    /// On any error other than `RepositoryAlreadyExists` the caller should
    /// run [`RepoStore::delete_repository`] to remove what was created.
    pub fn create_repository(&self, idea_id: &str, template: Template) -> Result<RepoMeta, RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let _lock = self.lock(&idea, LockMode::Exclusive)?;
        template::scaffold(&self.sandbox.repo_root(&idea), &idea, template)
    }

    /// Whether a repository exists; malformed ids never exist
    pub fn repository_exists(&self, idea_id: &str) -> bool {
        match IdeaId::parse(idea_id) {
            Ok(idea) => self.sandbox.repo_root(&idea).is_dir(),
            Err(_) => false,
        }
    }

    /// Remove a repository with all its files and histories.
    ///
    /// Returns `RepositoryNotFound` if there is nothing to delete.
    pub fn delete_repository(&self, idea_id: &str) -> Result<(), RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let _lock = self.lock(&idea, LockMode::Exclusive)?;
        let root = self.require_repo(&idea)?;
        fs::remove_dir_all(&root)?;
        info!(idea = %idea, "deleted repository");
        Ok(())
    }

    /// Template recorded in the repository's meta.json
    pub fn template(&self, idea_id: &str) -> Result<Template, RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let _lock = self.lock(&idea, LockMode::Shared)?;
        let root = self.require_repo(&idea)?;
        Ok(template::load_meta(&root)?.template)
    }

    /// Logical paths that may not be deleted in this repository
    pub fn required_files(&self, idea_id: &str) -> Result<Vec<&'static str>, RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let _lock = self.lock(&idea, LockMode::Shared)?;
        let root = self.require_repo(&idea)?;
        Ok(required_paths_for(&root))
    }

    /// Read a file's current content
    pub fn get_file_content(&self, idea_id: &str, path: &str) -> Result<Vec<u8>, RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let target = self.sandbox.resolve(&idea, path)?;
        let _lock = self.lock(&idea, LockMode::Shared)?;
        self.require_repo(&idea)?;
        read_live_file(&target)
    }

    /// Write a file, snapshotting its previous content if it existed.
    ///
    /// Returns the version recorded for the overwritten content, or `None`
    /// when the file was created.
    pub fn update_file(
        &self,
        idea_id: &str,
        path: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<Option<FileVersion>, RepoError> {
        let content = content.as_ref();
        let idea = IdeaId::parse(idea_id)?;
        let target = self.sandbox.resolve(&idea, path)?;
        let _lock = self.lock(&idea, LockMode::Exclusive)?;
        let root = self.require_repo(&idea)?;
        let versions = VersionManager::new(&root);

        let snapshot = match fs::metadata(&target.physical) {
            Ok(meta) if meta.is_dir() => return Err(RepoError::NotAFile(target.logical)),
            Ok(_) => {
                let prior = fs::read(&target.physical)?;
                Some(versions.record_pre_update_snapshot(
                    &target.logical,
                    &prior,
                    VersionOperation::Updated,
                )?)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = target.physical.parent() {
                    fs::create_dir_all(parent)?;
                }
                // A new file starts without history
                versions.remove_history(&target.logical)?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        write_atomic(&target.physical, content)?;
        info!(
            idea = %idea,
            path = %target.logical,
            size = content.len(),
            created = snapshot.is_none(),
            "updated file"
        );
        Ok(snapshot)
    }

    /// Delete a file or directory that is not part of the required manifest.
    ///
    /// Histories of everything removed are removed with it.
    pub fn delete_file(&self, idea_id: &str, path: &str) -> Result<(), RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let target = self.sandbox.resolve(&idea, path)?;
        let _lock = self.lock(&idea, LockMode::Exclusive)?;
        let root = self.require_repo(&idea)?;

        let required = required_paths_for(&root);
        let dir_prefix = format!("{}/", target.logical);
        if let Some(hit) = required
            .iter()
            .find(|req| **req == target.logical || req.starts_with(&dir_prefix))
        {
            return Err(RepoError::RequiredFileProtected((*hit).to_string()));
        }

        let meta = match fs::symlink_metadata(&target.physical) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RepoError::file_not_found(&target.logical));
            }
            Err(e) => return Err(e.into()),
        };

        let versions = VersionManager::new(&root);
        if meta.is_dir() {
            for logical in collect_files(&target.physical, &target.logical)? {
                versions.remove_history(&logical)?;
            }
            fs::remove_dir_all(&target.physical)?;
        } else {
            versions.remove_history(&target.logical)?;
            fs::remove_file(&target.physical)?;
        }

        info!(idea = %idea, path = %target.logical, "deleted file");
        Ok(())
    }

    /// List one directory level of a repository
    pub fn list_files(&self, idea_id: &str, sub_path: &str) -> Result<Vec<FileEntry>, RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let target = self.sandbox.resolve_dir(&idea, sub_path)?;
        let _lock = self.lock(&idea, LockMode::Shared)?;
        self.require_repo(&idea)?;
        require_dir(&target)?;
        debug!(idea = %idea, path = %target.logical, "listing directory");
        tree::list_dir(&target.physical, &target.logical)
    }

    /// Tree of a repository or subtree, expanded to `max_depth` levels.
    ///
    /// `None` uses the configured default depth.
    pub fn get_file_tree(
        &self,
        idea_id: &str,
        sub_path: &str,
        max_depth: Option<usize>,
    ) -> Result<FileTreeNode, RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let target = self.sandbox.resolve_dir(&idea, sub_path)?;
        let _lock = self.lock(&idea, LockMode::Shared)?;
        self.require_repo(&idea)?;
        require_dir(&target)?;
        let depth = max_depth.unwrap_or(self.config.default_tree_depth);
        debug!(idea = %idea, path = %target.logical, depth, "building tree");
        tree::build_tree(&target.physical, &target.logical, depth)
    }

    /// Statistics over a tree produced by [`RepoStore::get_file_tree`]
    pub fn tree_stats(&self, idea_id: &str, tree: &FileTreeNode) -> Result<TreeStats, RepoError> {
        let required = self.required_files(idea_id)?;
        Ok(TreeStats::from_tree(tree, &required))
    }

    /// Versions of a live file, newest first
    pub fn get_file_history(&self, idea_id: &str, path: &str) -> Result<Vec<FileVersion>, RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let target = self.sandbox.resolve(&idea, path)?;
        let _lock = self.lock(&idea, LockMode::Shared)?;
        let root = self.require_repo(&idea)?;
        require_live_file(&target)?;
        VersionManager::new(&root).history(&target.logical)
    }

    /// Content of one historical version of a live file
    pub fn get_file_version_content(
        &self,
        idea_id: &str,
        path: &str,
        version_id: &str,
    ) -> Result<Vec<u8>, RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let target = self.sandbox.resolve(&idea, path)?;
        let _lock = self.lock(&idea, LockMode::Shared)?;
        let root = self.require_repo(&idea)?;
        require_live_file(&target)?;
        VersionManager::new(&root).version_content(&target.logical, version_id)
    }

    /// Put a historical version's content back into the live file.
    ///
    /// The content being replaced is snapshotted first, so the history grows
    /// by one (subject to the usual cap). Returns that new snapshot.
    pub fn restore_file_version(
        &self,
        idea_id: &str,
        path: &str,
        version_id: &str,
    ) -> Result<FileVersion, RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let target = self.sandbox.resolve(&idea, path)?;
        let _lock = self.lock(&idea, LockMode::Exclusive)?;
        let root = self.require_repo(&idea)?;
        let versions = VersionManager::new(&root);

        let current = read_live_file(&target)?;
        let restored = versions.version_content(&target.logical, version_id)?;

        let snapshot = versions.record_pre_update_snapshot(
            &target.logical,
            &current,
            VersionOperation::Restored,
        )?;
        write_atomic(&target.physical, &restored)?;

        info!(
            idea = %idea,
            path = %target.logical,
            version = version_id,
            "restored file version"
        );
        Ok(snapshot)
    }
}

/// Required paths for a repository root, failing closed to the union of all
/// manifests when meta.json cannot be read
pub(crate) fn required_paths_for(root: &Path) -> Vec<&'static str> {
    match template::load_meta(root) {
        Ok(meta) => meta.template.required_paths(),
        Err(e) => {
            warn!(root = %root.display(), error = %e, "unreadable meta.json, protecting all template files");
            all_required_paths()
        }
    }
}

fn read_live_file(target: &ResolvedPath) -> Result<Vec<u8>, RepoError> {
    match fs::metadata(&target.physical) {
        Ok(meta) if meta.is_dir() => Err(RepoError::NotAFile(target.logical.clone())),
        Ok(_) => Ok(fs::read(&target.physical)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(RepoError::file_not_found(&target.logical))
        }
        Err(e) => Err(e.into()),
    }
}

fn require_live_file(target: &ResolvedPath) -> Result<(), RepoError> {
    match fs::metadata(&target.physical) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(RepoError::NotAFile(target.logical.clone())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(RepoError::file_not_found(&target.logical))
        }
        Err(e) => Err(e.into()),
    }
}

fn require_dir(target: &ResolvedPath) -> Result<(), RepoError> {
    match fs::metadata(&target.physical) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(RepoError::NotADirectory(target.logical.clone())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(RepoError::file_not_found(&target.logical))
        }
        Err(e) => Err(e.into()),
    }
}

/// Logical paths of all regular files below a directory
fn collect_files(physical: &Path, logical: &str) -> Result<Vec<String>, RepoError> {
    let mut out = Vec::new();
    for entry in fs::read_dir(physical)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let child_logical = format!("{}/{}", logical, name);
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            out.extend(collect_files(&entry.path(), &child_logical)?);
        } else if file_type.is_file() {
            out.push(child_logical);
        }
    }
    Ok(out)
}
