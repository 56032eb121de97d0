//! Repository templates
//!
//! A template is a fixed manifest of required files and directories. The
//! manifest doubles as the protection list: a path listed here can be
//! updated but never deleted.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RepoError;
use crate::types::IdeaId;

/// Directory holding the required metadata files
pub const META_DIR: &str = ".humanet";

/// Logical path of the repository metadata file
pub const META_FILE: &str = ".humanet/meta.json";

/// Current meta.json schema version
pub const META_SCHEMA_VERSION: u32 = 1;

/// Directories created for every template
pub const REQUIRED_DIRS: &[&str] = &[META_DIR, "docs", "media"];

/// Named repository template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Basic,
    Research,
    Technical,
}

/// How the seed content of a required file is produced
#[derive(Debug, Clone, Copy)]
pub enum SeedKind {
    /// Titled Markdown skeleton with the listed section headings
    Markdown {
        title: &'static str,
        sections: &'static [&'static str],
    },
    /// The repository's meta.json
    Meta,
}

/// One required file in a template manifest
#[derive(Debug, Clone, Copy)]
pub struct ManifestEntry {
    pub path: &'static str,
    pub seed: SeedKind,
}

const BASIC_FILES: &[ManifestEntry] = &[
    ManifestEntry {
        path: ".humanet/idea.md",
        seed: SeedKind::Markdown {
            title: "Idea",
            sections: &["Summary", "Tags", "Status"],
        },
    },
    ManifestEntry {
        path: ".humanet/scope.md",
        seed: SeedKind::Markdown {
            title: "Scope",
            sections: &["In Scope", "Out of Scope", "Milestones"],
        },
    },
    ManifestEntry {
        path: ".humanet/problem.md",
        seed: SeedKind::Markdown {
            title: "Problem Statement",
            sections: &["Problem", "Who Is Affected", "Why Now"],
        },
    },
    ManifestEntry {
        path: ".humanet/search.md",
        seed: SeedKind::Markdown {
            title: "Search Index",
            sections: &["Keywords", "Related Ideas"],
        },
    },
    ManifestEntry {
        path: META_FILE,
        seed: SeedKind::Meta,
    },
];

const RESEARCH_FILES: &[ManifestEntry] = &[
    ManifestEntry {
        path: ".humanet/methodology.md",
        seed: SeedKind::Markdown {
            title: "Methodology",
            sections: &["Research Questions", "Approach", "Data Sources"],
        },
    },
    ManifestEntry {
        path: ".humanet/references.md",
        seed: SeedKind::Markdown {
            title: "References",
            sections: &["Papers", "Links"],
        },
    },
];

const TECHNICAL_FILES: &[ManifestEntry] = &[
    ManifestEntry {
        path: ".humanet/architecture.md",
        seed: SeedKind::Markdown {
            title: "Architecture",
            sections: &["Overview", "Components", "Data Flow"],
        },
    },
    ManifestEntry {
        path: ".humanet/requirements.md",
        seed: SeedKind::Markdown {
            title: "Requirements",
            sections: &["Functional", "Non-Functional", "Constraints"],
        },
    },
];

impl Template {
    pub const ALL: [Template; 3] = [Template::Basic, Template::Research, Template::Technical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Basic => "basic",
            Template::Research => "research",
            Template::Technical => "technical",
        }
    }

    /// Required files of this template, shared files first
    pub fn manifest(&self) -> impl Iterator<Item = &'static ManifestEntry> {
        let extra: &'static [ManifestEntry] = match self {
            Template::Basic => &[],
            Template::Research => RESEARCH_FILES,
            Template::Technical => TECHNICAL_FILES,
        };
        BASIC_FILES.iter().chain(extra.iter())
    }

    /// Logical paths of the required files
    pub fn required_paths(&self) -> Vec<&'static str> {
        self.manifest().map(|entry| entry.path).collect()
    }

    pub fn is_required(&self, logical: &str) -> bool {
        self.manifest().any(|entry| entry.path == logical)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Template {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Template::Basic),
            "research" => Ok(Template::Research),
            "technical" => Ok(Template::Technical),
            _ => Err(RepoError::UnknownTemplate(s.to_string())),
        }
    }
}

/// Paths required by any template; used when meta.json cannot be read
pub fn all_required_paths() -> Vec<&'static str> {
    let mut paths: Vec<&'static str> = Vec::new();
    for template in Template::ALL {
        for path in template.required_paths() {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Contents of `.humanet/meta.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMeta {
    pub schema_version: u32,
    pub idea_id: String,
    pub template: Template,
    pub created_at: DateTime<Utc>,
}

impl RepoMeta {
    pub fn new(idea: &IdeaId, template: Template) -> Self {
        Self {
            schema_version: META_SCHEMA_VERSION,
            idea_id: idea.to_string(),
            template,
            created_at: Utc::now(),
        }
    }
}

/// Read meta.json from a repository root
pub fn load_meta(repo_root: &Path) -> Result<RepoMeta, RepoError> {
    let content = fs::read(repo_root.join(META_FILE))?;
    Ok(serde_json::from_slice(&content)?)
}

/// Render the seed content for a manifest entry
pub fn seed_content(entry: &ManifestEntry, meta: &RepoMeta) -> Result<Vec<u8>, RepoError> {
    match entry.seed {
        SeedKind::Markdown { title, sections } => {
            let mut out = format!("# {}\n\n", title);
            out.push_str(&format!(
                "> Idea `{}` ({} template)\n\n",
                meta.idea_id, meta.template
            ));
            for section in sections {
                out.push_str(&format!("## {}\n\n_Not written yet._\n\n", section));
            }
            Ok(out.into_bytes())
        }
        SeedKind::Meta => {
            let mut json = serde_json::to_vec_pretty(meta)?;
            json.push(b'\n');
            Ok(json)
        }
    }
}

/// Create a repository root and populate it from a template.
///
/// The root is created with a single non-recursive `create_dir`, so two
/// concurrent scaffolds of the same idea cannot both succeed. Errors after
/// that point leave a partial tree; the caller removes it.
pub fn scaffold(repo_root: &Path, idea: &IdeaId, template: Template) -> Result<RepoMeta, RepoError> {
    if let Some(parent) = repo_root.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::create_dir(repo_root) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(RepoError::RepositoryAlreadyExists(idea.to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    for dir in REQUIRED_DIRS {
        fs::create_dir_all(repo_root.join(dir))?;
    }

    let meta = RepoMeta::new(idea, template);
    for entry in template.manifest() {
        let content = seed_content(entry, &meta)?;
        fs::write(repo_root.join(entry.path), content)?;
        debug!(idea = %idea, path = entry.path, "seeded required file");
    }

    info!(idea = %idea, template = %template, "scaffolded repository");
    Ok(meta)
}
