//! Per-file version history
//!
//! Before an existing file is overwritten its current content is copied to a
//! backup blob and a [`FileVersion`] record is pushed onto that file's
//! history. Histories live in the hidden `.versions/` directory of the
//! repository:
//!
//! ```text
//! .versions/<path-key>/history.json
//! .versions/<path-key>/<version-id>.bak
//! ```
//!
//! `<path-key>` is derived from the normalized logical path, so the history
//! follows the path, not the file's content. At most [`HISTORY_CAPACITY`]
//! records are kept; pushing past that evicts the oldest record and deletes
//! its backup.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::RepoError;
use crate::fsutil::write_atomic;
use crate::types::ids::{generate_version_id, is_version_id};
use crate::types::{FileVersion, VersionOperation};

/// Hidden directory holding all histories of a repository
pub const VERSIONS_DIR: &str = ".versions";

/// File name of the history index inside a path's history directory
pub const HISTORY_FILE: &str = "history.json";

/// Extension of backup blobs
pub const BACKUP_EXT: &str = "bak";

/// Maximum number of versions retained per file
pub const HISTORY_CAPACITY: usize = 5;

/// Bounded most-recent-first history of one logical path.
///
/// The capacity is enforced by [`VersionHistory::push`]; there is no other
/// way to add a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistory {
    /// Logical path this history belongs to
    path: String,
    /// Sequence number the next record will get
    next_seq: u64,
    /// Records, newest first
    entries: VecDeque<FileVersion>,
}

impl VersionHistory {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            next_seq: 1,
            entries: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records, newest first
    pub fn entries(&self) -> impl Iterator<Item = &FileVersion> {
        self.entries.iter()
    }

    pub fn find(&self, version_id: &str) -> Option<&FileVersion> {
        self.entries.iter().find(|v| v.id == version_id)
    }

    /// Take the next sequence number
    pub fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Push a record at the head, returning the records evicted from the tail
    pub fn push(&mut self, version: FileVersion) -> Vec<FileVersion> {
        if version.seq >= self.next_seq {
            self.next_seq = version.seq + 1;
        }
        self.entries.push_front(version);
        self.trim()
    }

    /// Drop records beyond capacity, oldest first
    fn trim(&mut self) -> Vec<FileVersion> {
        let mut evicted = Vec::new();
        while self.entries.len() > HISTORY_CAPACITY {
            if let Some(oldest) = self.entries.pop_back() {
                evicted.push(oldest);
            }
        }
        evicted
    }

    /// Restore newest-first order by sequence number
    fn sort(&mut self) {
        self.entries
            .make_contiguous()
            .sort_by(|a, b| b.seq.cmp(&a.seq));
    }
}

/// Hash key for a logical path: first 16 bytes of SHA-256, hex-encoded
pub fn path_key(logical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(logical.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Version bookkeeping for one repository.
///
/// Callers hold the repository's exclusive lock for every mutating call.
#[derive(Debug, Clone)]
pub struct VersionManager {
    repo_root: PathBuf,
}

impl VersionManager {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    /// Root of all histories in this repository
    pub fn versions_root(&self) -> PathBuf {
        self.repo_root.join(VERSIONS_DIR)
    }

    /// History directory of one logical path
    pub fn history_dir(&self, logical: &str) -> PathBuf {
        self.versions_root().join(path_key(logical))
    }

    pub(crate) fn backup_rel_path(logical: &str, version_id: &str) -> String {
        format!(
            "{}/{}/{}.{}",
            VERSIONS_DIR,
            path_key(logical),
            version_id,
            BACKUP_EXT
        )
    }

    /// Load the history of a path; a path never overwritten has an empty one
    pub fn load_history(&self, logical: &str) -> Result<VersionHistory, RepoError> {
        let history_path = self.history_dir(logical).join(HISTORY_FILE);
        let bytes = match fs::read(&history_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(VersionHistory::new(logical));
            }
            Err(e) => return Err(e.into()),
        };

        let mut history: VersionHistory = serde_json::from_slice(&bytes).map_err(|e| {
            RepoError::Corrupt(format!("{}: {}", history_path.display(), e))
        })?;
        if history.path != logical {
            return Err(RepoError::Corrupt(format!(
                "{} belongs to '{}', expected '{}'",
                history_path.display(),
                history.path,
                logical
            )));
        }
        history.sort();
        Ok(history)
    }

    fn save_history(&self, history: &VersionHistory) -> Result<(), RepoError> {
        let dir = self.history_dir(&history.path);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_vec_pretty(history)?;
        write_atomic(&dir.join(HISTORY_FILE), &json)?;
        Ok(())
    }

    /// Snapshot the content a file had just before it is overwritten.
    ///
    /// The backup blob is written first, then the index; evicted backups are
    /// removed last so a crash can leave an orphan blob but never a record
    /// without its blob.
    pub fn record_pre_update_snapshot(
        &self,
        logical: &str,
        prior_content: &[u8],
        operation: VersionOperation,
    ) -> Result<FileVersion, RepoError> {
        let mut history = self.load_history(logical)?;

        let id = generate_version_id();
        let backup_path = Self::backup_rel_path(logical, &id);
        let version = FileVersion {
            seq: history.allocate_seq(),
            id,
            timestamp: Utc::now(),
            size: prior_content.len() as u64,
            operation,
            backup_path,
        };

        fs::create_dir_all(self.history_dir(logical))?;
        write_atomic(&self.repo_root.join(&version.backup_path), prior_content)?;

        let evicted = history.push(version.clone());
        self.save_history(&history)?;

        for old in &evicted {
            remove_if_exists(&self.repo_root.join(&old.backup_path))?;
            debug!(path = logical, version = %old.id, seq = old.seq, "evicted version");
        }

        info!(
            path = logical,
            version = %version.id,
            seq = version.seq,
            operation = operation.as_str(),
            "recorded version"
        );
        Ok(version)
    }

    /// Versions of a path, newest first
    pub fn history(&self, logical: &str) -> Result<Vec<FileVersion>, RepoError> {
        Ok(self
            .load_history(logical)?
            .entries()
            .take(HISTORY_CAPACITY)
            .cloned()
            .collect())
    }

    /// Look up one version record; malformed ids never touch the index
    pub fn find_version(&self, logical: &str, version_id: &str) -> Result<FileVersion, RepoError> {
        if !is_version_id(version_id) {
            return Err(RepoError::version_not_found(logical, version_id));
        }
        self.load_history(logical)?
            .find(version_id)
            .cloned()
            .ok_or_else(|| RepoError::version_not_found(logical, version_id))
    }

    /// Content stored for one version
    pub fn version_content(&self, logical: &str, version_id: &str) -> Result<Vec<u8>, RepoError> {
        let version = self.find_version(logical, version_id)?;
        match fs::read(self.repo_root.join(&version.backup_path)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RepoError::Corrupt(format!(
                "backup for version {} of {} is missing",
                version.id, logical
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a path's history and all of its backups
    pub fn remove_history(&self, logical: &str) -> Result<(), RepoError> {
        let dir = self.history_dir(logical);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(path = logical, "removed history");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Every history stored in this repository, each loaded independently
    pub fn load_all_histories(&self) -> Result<Vec<Result<VersionHistory, RepoError>>, RepoError> {
        let root = self.versions_root();
        let mut out = Vec::new();
        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let history_path = entry.path().join(HISTORY_FILE);
            let loaded = fs::read(&history_path)
                .map_err(RepoError::from)
                .and_then(|bytes| {
                    serde_json::from_slice::<VersionHistory>(&bytes).map_err(|e| {
                        RepoError::Corrupt(format!("{}: {}", history_path.display(), e))
                    })
                });
            out.push(loaded);
        }
        Ok(out)
    }
}

fn remove_if_exists(path: &Path) -> Result<(), RepoError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
