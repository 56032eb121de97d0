use thiserror::Error;

/// Main error type for repository operations
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repository already exists: {0}")]
    RepositoryAlreadyExists(String),

    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("required file cannot be deleted: {0}")]
    RequiredFileProtected(String),

    #[error("path escapes repository root: {0}")]
    PathTraversalRejected(String),

    #[error("version '{version_id}' not found for {path}")]
    VersionNotFound { path: String, version_id: String },

    #[error("invalid idea id: {0}")]
    InvalidIdeaId(#[from] crate::types::ids::IdParseError),

    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("repository busy: {0}")]
    RepositoryBusy(String),

    #[error("corrupt history store: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl RepoError {
    /// Get the error code for JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            RepoError::RepositoryAlreadyExists(_) => "repository_already_exists",
            RepoError::RepositoryNotFound(_) => "repository_not_found",
            RepoError::FileNotFound(_) => "file_not_found",
            RepoError::RequiredFileProtected(_) => "required_file_protected",
            RepoError::PathTraversalRejected(_) => "path_traversal_rejected",
            RepoError::VersionNotFound { .. } => "version_not_found",
            RepoError::InvalidIdeaId(_) => "invalid_args",
            RepoError::UnknownTemplate(_) => "invalid_args",
            RepoError::NotAFile(_) => "not_a_file",
            RepoError::NotADirectory(_) => "not_a_directory",
            RepoError::RepositoryBusy(_) => "repository_busy",
            RepoError::Corrupt(_) => "corrupt_history",
            RepoError::Io(_) => "io_error",
            RepoError::Json(_) => "internal_error",
            RepoError::TomlParse(_) => "invalid_config",
            RepoError::TomlSerialize(_) => "internal_error",
        }
    }

    /// Get the exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            RepoError::InvalidIdeaId(_)
            | RepoError::UnknownTemplate(_)
            | RepoError::PathTraversalRejected(_)
            | RepoError::TomlParse(_) => 2,
            RepoError::RepositoryNotFound(_)
            | RepoError::FileNotFound(_)
            | RepoError::VersionNotFound { .. } => 3,
            RepoError::RepositoryAlreadyExists(_)
            | RepoError::RequiredFileProtected(_)
            | RepoError::NotAFile(_)
            | RepoError::NotADirectory(_) => 4,
            RepoError::RepositoryBusy(_) | RepoError::Io(_) => 5,
            _ => 1,
        }
    }

    /// Get actionable suggestions for fixing the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            RepoError::RepositoryNotFound(_) => {
                vec!["Run 'humanet-repo create <idea>' to scaffold the repository"]
            }
            RepoError::RepositoryAlreadyExists(_) => {
                vec!["Run 'humanet-repo delete <idea>' first to start over"]
            }
            RepoError::VersionNotFound { .. } => {
                vec!["Run 'humanet-repo history <idea> <path>' to see available versions"]
            }
            RepoError::RequiredFileProtected(_) => vec![
                "Required files can be updated with 'humanet-repo write' but not removed",
            ],
            RepoError::UnknownTemplate(_) => {
                vec!["Valid templates are: basic, research, technical"]
            }
            RepoError::RepositoryBusy(_) => vec![
                "Wait for the other operation to finish and retry",
                "Or raise lock_timeout_ms in humanet-repo.toml",
            ],
            RepoError::Corrupt(_) => {
                vec!["Run 'humanet-repo check <idea>' to inspect the history store"]
            }
            _ => vec![],
        }
    }

    /// Create a FileNotFound error for a logical path
    pub fn file_not_found(path: &str) -> Self {
        RepoError::FileNotFound(display_path(path))
    }

    /// Create a VersionNotFound error, truncating long ids
    pub fn version_not_found(path: &str, version_id: &str) -> Self {
        RepoError::VersionNotFound {
            path: display_path(path),
            version_id: if version_id.chars().count() > 64 {
                format!("{}...", version_id.chars().take(64).collect::<String>())
            } else {
                version_id.to_string()
            },
        }
    }

    /// Create a PathTraversalRejected error for a raw logical path
    pub fn traversal(path: &str) -> Self {
        RepoError::PathTraversalRejected(format!("'{}'", path.escape_debug()))
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
