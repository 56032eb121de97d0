//! Per-idea repository locks
//!
//! Each idea has a lock file at `<storage_root>/.locks/<ideaId>.lock`.
//! Mutations take it exclusively, reads take it shared. The locks are
//! fs2 advisory locks, so they serialize threads (each guard opens its own
//! handle) as well as separate processes sharing the storage root.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::RepoError;
use crate::types::IdeaId;

/// Directory under the storage root holding lock files
pub const LOCKS_DIR: &str = ".locks";

const INITIAL_BACKOFF: Duration = Duration::from_millis(2);
const MAX_BACKOFF: Duration = Duration::from_millis(100);

/// Lock mode for a repository operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Readers; any number may hold the lock together
    Shared,
    /// Writers; excludes readers and other writers
    Exclusive,
}

impl LockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Shared => "shared",
            LockMode::Exclusive => "exclusive",
        }
    }
}

/// Held repository lock; released when dropped
pub struct RepoLock {
    /// Lock file handle - flock released on drop
    file: File,
    idea: IdeaId,
    mode: LockMode,
}

impl std::fmt::Debug for RepoLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoLock")
            .field("idea", &self.idea)
            .field("mode", &self.mode)
            .finish()
    }
}

impl RepoLock {
    /// Path of the lock file for an idea
    pub fn lock_path(storage_root: &Path, idea: &IdeaId) -> PathBuf {
        storage_root
            .join(LOCKS_DIR)
            .join(format!("{}.lock", idea.as_str()))
    }

    /// Try once to take the lock without waiting.
    ///
    /// Returns `RepoError::RepositoryBusy` if a conflicting lock is held.
    pub fn try_acquire(storage_root: &Path, idea: &IdeaId, mode: LockMode) -> Result<Self, RepoError> {
        let file = open_lock_file(storage_root, idea)?;
        try_lock(&file, mode).map_err(|e| {
            RepoError::RepositoryBusy(format!("{} is locked: {}", idea, e))
        })?;
        Ok(Self {
            file,
            idea: idea.clone(),
            mode,
        })
    }

    /// Take the lock, retrying with exponential backoff until `timeout`.
    ///
    /// Returns `RepoError::RepositoryBusy` if the timeout expires first.
    pub fn acquire(
        storage_root: &Path,
        idea: &IdeaId,
        mode: LockMode,
        timeout: Duration,
    ) -> Result<Self, RepoError> {
        let file = open_lock_file(storage_root, idea)?;

        let start = Instant::now();
        let mut delay = INITIAL_BACKOFF;
        let mut waited = false;

        loop {
            match try_lock(&file, mode) {
                Ok(()) => break,
                Err(_) if start.elapsed() < timeout => {
                    if !waited {
                        debug!(idea = %idea, mode = mode.as_str(), "waiting for repository lock");
                        waited = true;
                    }
                    std::thread::sleep(delay);
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
                Err(e) => {
                    warn!(idea = %idea, mode = mode.as_str(), "timed out waiting for repository lock");
                    return Err(RepoError::RepositoryBusy(format!(
                        "Timeout waiting for lock on {}: {}",
                        idea, e
                    )));
                }
            }
        }

        Ok(Self {
            file,
            idea: idea.clone(),
            mode,
        })
    }

    pub fn idea(&self) -> &IdeaId {
        &self.idea
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn open_lock_file(storage_root: &Path, idea: &IdeaId) -> Result<File, RepoError> {
    let path = RepoLock::lock_path(storage_root, idea);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;
    Ok(file)
}

fn try_lock(file: &File, mode: LockMode) -> std::io::Result<()> {
    match mode {
        LockMode::Shared => FileExt::try_lock_shared(file),
        LockMode::Exclusive => FileExt::try_lock_exclusive(file),
    }
}
