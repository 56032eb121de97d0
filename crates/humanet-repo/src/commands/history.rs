use libhumanet_repo::{FileVersion, RepoError};
use serde::Serialize;
use crate::cli::Cli;
use crate::commands::files::{print_content, ContentOutput};
use crate::context::RepoContext;
use crate::output::{format_size, output_success, table};

#[derive(Serialize)]
struct HistoryOutput {
    idea_id: String,
    path: String,
    versions: Vec<FileVersion>,
}

#[derive(Serialize)]
struct RestoreOutput {
    idea_id: String,
    path: String,
    restored_version: String,
    snapshot: FileVersion,
}

pub fn run_history(cli: &Cli, idea: &str, path: &str) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    let versions = store.get_file_history(idea, path)?;

    let output = HistoryOutput {
        idea_id: idea.to_string(),
        path: path.to_string(),
        versions,
    };
    output_success(cli, output, |out| {
        if out.versions.is_empty() {
            println!("No saved versions of {}", out.path);
            return;
        }
        let mut t = table(&["Seq", "Version", "Saved", "Size", "Operation"]);
        for v in &out.versions {
            t.add_row(vec![
                v.seq.to_string(),
                v.id.clone(),
                v.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                format_size(v.size),
                v.operation.as_str().to_string(),
            ]);
        }
        println!("{}", t);
    })
}

pub fn run_show(cli: &Cli, idea: &str, path: &str, version: &str) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    let content = store.get_file_version_content(idea, path, version)?;
    print_content(cli, ContentOutput::new(idea, path, Some(version), content))
}

pub fn run_restore(cli: &Cli, idea: &str, path: &str, version: &str) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    let snapshot = store.restore_file_version(idea, path, version)?;

    let output = RestoreOutput {
        idea_id: idea.to_string(),
        path: path.to_string(),
        restored_version: version.to_string(),
        snapshot,
    };
    output_success(cli, output, |out| {
        println!("Restored {} to version {}", out.path, out.restored_version);
        println!("Replaced content saved as {}", out.snapshot.id);
    })
}
