pub mod entry;
pub mod ids;
pub mod version;

pub use entry::{EntryKind, FileEntry, FileTreeNode};
pub use ids::IdeaId;
pub use version::{FileVersion, VersionOperation};
