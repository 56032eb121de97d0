use std::path::PathBuf;

use libhumanet_repo::{config::CONFIG_FILE_NAME, load_config, RepoError, RepoStore, StorageConfig};
use tracing::debug;

use crate::cli::Cli;

/// Resolved settings for a command
pub struct RepoContext {
    pub config: StorageConfig,
}

impl RepoContext {
    /// Resolve configuration from `--config`, then ./humanet-repo.toml,
    /// then defaults. `--storage-root` overrides whatever was loaded.
    pub fn resolve(cli: &Cli) -> Result<Self, RepoError> {
        let (mut config, config_path) = match &cli.config {
            Some(path) => match load_config(path)? {
                Some(config) => (config, Some(path.clone())),
                None => {
                    return Err(RepoError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("config file not found: {}", path.display()),
                    )))
                }
            },
            None => {
                let default_path = PathBuf::from(CONFIG_FILE_NAME);
                match load_config(&default_path)? {
                    Some(config) => (config, Some(default_path)),
                    None => (StorageConfig::default(), None),
                }
            }
        };

        if let Some(root) = &cli.storage_root {
            config.storage_root = root.clone();
        }

        debug!(
            storage_root = %config.storage_root.display(),
            config = ?config_path,
            "resolved configuration"
        );
        Ok(Self { config })
    }

    pub fn open_store(&self) -> RepoStore {
        RepoStore::new(self.config.clone())
    }
}
