use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What caused a snapshot to be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOperation {
    /// Content was overwritten by an update
    Updated,
    /// Content was overwritten by restoring an older version
    Restored,
}

impl VersionOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionOperation::Updated => "updated",
            VersionOperation::Restored => "restored",
        }
    }
}

/// A retained snapshot of a file's content taken just before an overwrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    pub id: String,
    /// Per-file creation order; strictly increasing, never reused
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    /// Size of the snapshot content in bytes
    pub size: u64,
    pub operation: VersionOperation,
    /// Location of the backup blob relative to the repository root
    pub backup_path: String,
}
