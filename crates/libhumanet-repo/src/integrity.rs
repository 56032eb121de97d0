//! Integrity checking for repositories
//!
//! Verifies that the template's required files are present and that the
//! history store is consistent: every record has its backup, no backup is
//! unreferenced, histories stay within capacity and belong to live files.

use std::collections::HashSet;
use std::fs;

use serde::Serialize;

use crate::error::RepoError;
use crate::fsutil::dir_size;
use crate::lock::LockMode;
use crate::sandbox::normalize;
use crate::store::{required_paths_for, RepoStore};
use crate::template::{self, REQUIRED_DIRS};
use crate::types::IdeaId;
use crate::versions::{VersionManager, BACKUP_EXT, HISTORY_CAPACITY, HISTORY_FILE};

/// Result of an integrity check
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    /// Template named in meta.json, if it could be read
    pub template: Option<String>,
    /// Required files that are missing
    pub missing_required: Vec<String>,
    /// Required directories that are missing
    pub missing_dirs: Vec<String>,
    /// Histories inspected
    pub histories_checked: usize,
    /// Version records inspected
    pub versions_checked: usize,
    /// Bytes used by the history store
    pub versions_size_bytes: u64,
    /// Problems found in the history store
    pub problems: Vec<HistoryProblem>,
}

/// A problem found in the history store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryProblem {
    /// history.json could not be read or parsed
    Unreadable { location: String, error: String },
    /// A record whose backup blob is gone
    MissingBackup { path: String, version_id: String },
    /// A backup blob no record points at
    OrphanBackup { location: String },
    /// More records than the cap allows
    OverCapacity { path: String, len: usize },
    /// History kept for a path that has no live file
    OrphanHistory { path: String },
    /// A path in history.json that does not stay inside the repository
    UnsafePath { path: String },
}

impl IntegrityReport {
    /// Check if the report indicates all is well
    pub fn is_healthy(&self) -> bool {
        self.template.is_some()
            && self.missing_required.is_empty()
            && self.missing_dirs.is_empty()
            && self.problems.is_empty()
    }

    pub fn problem_count(&self) -> usize {
        self.problems.len() + self.missing_required.len() + self.missing_dirs.len()
    }
}

impl RepoStore {
    /// Check a repository's required files and history store.
    ///
    /// Read-only; takes the shared lock so it sees a consistent state.
    pub fn check_repository(&self, idea_id: &str) -> Result<IntegrityReport, RepoError> {
        let idea = IdeaId::parse(idea_id)?;
        let _lock = self.lock(&idea, LockMode::Shared)?;
        let root = self.sandbox().repo_root(&idea);
        if !root.is_dir() {
            return Err(RepoError::RepositoryNotFound(idea.to_string()));
        }

        let mut report = IntegrityReport {
            template: template::load_meta(&root)
                .ok()
                .map(|m| m.template.as_str().to_string()),
            ..Default::default()
        };

        for path in required_paths_for(&root) {
            if !root.join(path).is_file() {
                report.missing_required.push(path.to_string());
            }
        }
        for dir in REQUIRED_DIRS {
            if !root.join(dir).is_dir() {
                report.missing_dirs.push(dir.to_string());
            }
        }

        let versions = VersionManager::new(&root);
        if versions.versions_root().is_dir() {
            report.versions_size_bytes = dir_size(&versions.versions_root())?;
        }

        let mut referenced: HashSet<String> = HashSet::new();
        for loaded in versions.load_all_histories()? {
            let history = match loaded {
                Ok(history) => history,
                Err(e) => {
                    report.problems.push(HistoryProblem::Unreadable {
                        location: versions.versions_root().display().to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            report.histories_checked += 1;

            if history.len() > HISTORY_CAPACITY {
                report.problems.push(HistoryProblem::OverCapacity {
                    path: history.path().to_string(),
                    len: history.len(),
                });
            }

            // Paths come from an index on disk and are not trusted
            let live = match normalize(history.path()) {
                Ok(segments) if !segments.is_empty() => segments.join("/"),
                _ => {
                    report.problems.push(HistoryProblem::UnsafePath {
                        path: history.path().to_string(),
                    });
                    continue;
                }
            };
            if !root.join(&live).is_file() {
                report.problems.push(HistoryProblem::OrphanHistory {
                    path: history.path().to_string(),
                });
            }
            for version in history.entries() {
                report.versions_checked += 1;
                let expected = VersionManager::backup_rel_path(history.path(), &version.id);
                if version.backup_path != expected {
                    report.problems.push(HistoryProblem::UnsafePath {
                        path: version.backup_path.clone(),
                    });
                    continue;
                }
                referenced.insert(version.backup_path.clone());
                if !root.join(&version.backup_path).is_file() {
                    report.problems.push(HistoryProblem::MissingBackup {
                        path: history.path().to_string(),
                        version_id: version.id.clone(),
                    });
                }
            }
        }

        // Blobs of unreadable histories cannot be told apart from orphans
        let any_unreadable = report
            .problems
            .iter()
            .any(|p| matches!(p, HistoryProblem::Unreadable { .. }));
        if !any_unreadable {
            collect_orphan_backups(&versions, &root, &referenced, &mut report)?;
        }

        Ok(report)
    }
}

fn collect_orphan_backups(
    versions: &VersionManager,
    root: &std::path::Path,
    referenced: &HashSet<String>,
    report: &mut IntegrityReport,
) -> Result<(), RepoError> {
    let versions_root = versions.versions_root();
    if !versions_root.is_dir() {
        return Ok(());
    }
    for dir in fs::read_dir(&versions_root)? {
        let dir = dir?;
        if !dir.file_type()?.is_dir() {
            continue;
        }
        for blob in fs::read_dir(dir.path())? {
            let blob = blob?;
            let path = blob.path();
            if path.file_name().map(|n| n == HISTORY_FILE).unwrap_or(false) {
                continue;
            }
            if path.extension().map(|e| e != BACKUP_EXT).unwrap_or(true) {
                continue;
            }
            let rel = path
                .strip_prefix(root)
                .map(|p| {
                    p.components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/")
                })
                .unwrap_or_else(|_| path.display().to_string());
            if !referenced.contains(&rel) {
                report.problems.push(HistoryProblem::OrphanBackup { location: rel });
            }
        }
    }
    Ok(())
}
