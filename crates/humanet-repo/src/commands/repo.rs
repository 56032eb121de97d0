use libhumanet_repo::{IntegrityReport, RepoError, Template};
use serde::Serialize;
use tracing::warn;
use crate::cli::Cli;
use crate::context::RepoContext;
use crate::output::{format_size, output_success};

#[derive(Serialize)]
struct CreateOutput {
    idea_id: String,
    template: String,
    path: String,
    created_at: String,
    required_files: Vec<String>,
}

#[derive(Serialize)]
struct ExistsOutput {
    idea_id: String,
    exists: bool,
}

#[derive(Serialize)]
struct DeleteOutput {
    idea_id: String,
    deleted: bool,
}

#[derive(Serialize)]
struct CheckOutput {
    idea_id: String,
    healthy: bool,
    #[serde(flatten)]
    report: IntegrityReport,
}

pub fn run_create(cli: &Cli, idea: &str, template: &str) -> Result<(), RepoError> {
    let template: Template = template.parse()?;
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();

    let meta = match store.create_repository(idea, template) {
        Ok(meta) => meta,
        Err(e) if matches!(e, RepoError::Io(_) | RepoError::Json(_)) => {
            // Scaffold failed part way; remove the partial tree
            if let Err(cleanup) = store.delete_repository(idea) {
                warn!(idea, error = %cleanup, "failed to remove partial repository");
            }
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let output = CreateOutput {
        idea_id: meta.idea_id.clone(),
        template: meta.template.to_string(),
        path: store.repo_root(idea)?.display().to_string(),
        created_at: meta.created_at.to_rfc3339(),
        required_files: template.required_paths().iter().map(|p| p.to_string()).collect(),
    };
    output_success(cli, output, |out| {
        println!("Created {} repository '{}' at {}", out.template, out.idea_id, out.path);
        for path in &out.required_files {
            println!("  {}", path);
        }
    })
}

pub fn run_exists(cli: &Cli, idea: &str) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    let output = ExistsOutput {
        idea_id: idea.to_string(),
        exists: store.repository_exists(idea),
    };
    output_success(cli, output, |out| {
        if out.exists {
            println!("Repository '{}' exists", out.idea_id);
        } else {
            println!("Repository '{}' does not exist", out.idea_id);
        }
    })
}

pub fn run_delete(cli: &Cli, idea: &str) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    store.delete_repository(idea)?;

    output_success(
        cli,
        DeleteOutput {
            idea_id: idea.to_string(),
            deleted: true,
        },
        |out| println!("Deleted repository '{}'", out.idea_id),
    )
}

pub fn run_check(cli: &Cli, idea: &str) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    let report = store.check_repository(idea)?;

    let output = CheckOutput {
        idea_id: idea.to_string(),
        healthy: report.is_healthy(),
        report,
    };
    output_success(cli, output, |out| {
        let report = &out.report;
        match &report.template {
            Some(template) => println!("Template: {}", template),
            None => println!("Template: unknown (meta.json unreadable)"),
        }
        println!(
            "Histories: {} ({} versions, {})",
            report.histories_checked,
            report.versions_checked,
            format_size(report.versions_size_bytes)
        );
        for path in &report.missing_required {
            println!("  missing required file: {}", path);
        }
        for dir in &report.missing_dirs {
            println!("  missing directory: {}", dir);
        }
        for problem in &report.problems {
            println!("  {:?}", problem);
        }
        if out.healthy {
            println!("Repository '{}' is healthy", out.idea_id);
        } else {
            println!(
                "Repository '{}' has {} problem(s)",
                out.idea_id,
                report.problem_count()
            );
        }
    })
}
