use std::path::Path;

use libhumanet_repo::{save_config, RepoError};
use serde::Serialize;

use crate::cli::Cli;
use crate::context::RepoContext;
use crate::output::output_success;

#[derive(Serialize)]
struct ConfigOutput {
    storage_root: String,
    lock_timeout_ms: u64,
    default_tree_depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_to: Option<String>,
}

pub fn run(cli: &Cli, write: Option<&Path>) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;

    let written_to = match write {
        Some(path) => {
            save_config(path, &ctx.config)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let output = ConfigOutput {
        storage_root: ctx.config.storage_root.display().to_string(),
        lock_timeout_ms: ctx.config.lock_timeout_ms,
        default_tree_depth: ctx.config.default_tree_depth,
        written_to,
    };
    output_success(cli, output, |out| {
        println!("storage_root = {}", out.storage_root);
        println!("lock_timeout_ms = {}", out.lock_timeout_ms);
        println!("default_tree_depth = {}", out.default_tree_depth);
        if let Some(path) = &out.written_to {
            println!("Saved to {}", path);
        }
    })
}
