//! Sandboxed per-idea repositories.
//!
//! Each idea owns a directory tree under the storage root, scaffolded from a
//! [`Template`]. [`RepoStore`] provides file CRUD, listings and trees, and a
//! bounded per-file version history with restore. All paths pass through the
//! [`Sandbox`] and all mutations of one idea are serialized by a per-idea
//! file lock.

pub mod config;
pub mod error;
pub mod fsutil;
pub mod integrity;
pub mod lock;
pub mod sandbox;
pub mod store;
pub mod template;
pub mod tree;
pub mod types;
pub mod versions;

pub use config::{load_config, save_config, StorageConfig};
pub use error::RepoError;
pub use integrity::{HistoryProblem, IntegrityReport};
pub use lock::{LockMode, RepoLock};
pub use sandbox::{ResolvedPath, Sandbox};
pub use store::RepoStore;
pub use template::{RepoMeta, Template};
pub use tree::TreeStats;
pub use types::{EntryKind, FileEntry, FileTreeNode, FileVersion, IdeaId, VersionOperation};
pub use versions::{VersionHistory, VersionManager, HISTORY_CAPACITY};
