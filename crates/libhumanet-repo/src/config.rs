use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::RepoError;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "humanet-repo.toml";

/// Default storage root relative to the working directory
pub const DEFAULT_STORAGE_ROOT: &str = "storage/ideas";

/// Default time to wait for a repository lock
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Default expansion depth for tree listings
pub const DEFAULT_TREE_DEPTH: usize = 3;

/// Storage configuration stored in humanet-repo.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per idea
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    /// How long mutating operations wait for the per-idea lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Depth used by tree listings when the caller gives none
    #[serde(default = "default_tree_depth")]
    pub default_tree_depth: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            default_tree_depth: DEFAULT_TREE_DEPTH,
        }
    }
}

impl StorageConfig {
    /// Config rooted at the given storage directory, other values default
    pub fn with_root(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Default::default()
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_ROOT)
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}

/// Load storage config from a TOML file
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_config(path: &Path) -> Result<Option<StorageConfig>, RepoError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let config: StorageConfig = toml::from_str(&content)?;
    Ok(Some(config))
}

/// Save storage config to a TOML file
pub fn save_config(path: &Path, config: &StorageConfig) -> Result<(), RepoError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
