use std::io::{Read, Write};

use libhumanet_repo::{FileEntry, FileTreeNode, FileVersion, RepoError, TreeStats};
use serde::Serialize;
use crate::cli::Cli;
use crate::context::RepoContext;
use crate::output::{format_size, output_success, table};

#[derive(Serialize)]
struct ListOutput {
    idea_id: String,
    path: String,
    entries: Vec<FileEntry>,
}

#[derive(Serialize)]
struct TreeOutput {
    idea_id: String,
    tree: FileTreeNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<TreeStats>,
}

#[derive(Serialize)]
pub(crate) struct ContentOutput {
    pub idea_id: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    pub size: usize,
    /// Set when the content is not valid UTF-8 and `content` is lossy
    pub binary: bool,
    pub content: String,
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl ContentOutput {
    pub(crate) fn new(idea: &str, path: &str, version_id: Option<&str>, raw: Vec<u8>) -> Self {
        let (content, binary) = match std::str::from_utf8(&raw) {
            Ok(text) => (text.to_string(), false),
            Err(_) => (String::from_utf8_lossy(&raw).into_owned(), true),
        };
        Self {
            idea_id: idea.to_string(),
            path: path.to_string(),
            version_id: version_id.map(str::to_string),
            size: raw.len(),
            binary,
            content,
            raw,
        }
    }
}

#[derive(Serialize)]
struct WriteOutput {
    idea_id: String,
    path: String,
    size: usize,
    created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<FileVersion>,
}

#[derive(Serialize)]
struct RemoveOutput {
    idea_id: String,
    path: String,
    deleted: bool,
}

pub fn run_ls(cli: &Cli, idea: &str, path: &str) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    let entries = store.list_files(idea, path)?;

    let output = ListOutput {
        idea_id: idea.to_string(),
        path: path.to_string(),
        entries,
    };
    output_success(cli, output, |out| {
        if out.entries.is_empty() {
            println!("(empty)");
            return;
        }
        let mut t = table(&["Type", "Name", "Size", "Modified"]);
        for entry in &out.entries {
            let kind = if entry.is_dir() { "dir" } else { "file" };
            let name = if entry.is_dir() {
                format!("{}/", entry.name)
            } else {
                entry.name.clone()
            };
            let size = if entry.is_dir() {
                String::new()
            } else {
                format_size(entry.size)
            };
            let modified = entry
                .last_modified
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            t.add_row(vec![kind.to_string(), name, size, modified]);
        }
        println!("{}", t);
    })
}

pub fn run_tree(
    cli: &Cli,
    idea: &str,
    path: &str,
    depth: Option<usize>,
    with_stats: bool,
) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    let tree = store.get_file_tree(idea, path, depth)?;
    let stats = if with_stats {
        Some(store.tree_stats(idea, &tree)?)
    } else {
        None
    };

    let output = TreeOutput {
        idea_id: idea.to_string(),
        tree,
        stats,
    };
    output_success(cli, output, |out| {
        let label = if out.tree.path.is_empty() {
            format!("{}/", out.idea_id)
        } else {
            format!("{}/", out.tree.path)
        };
        println!("{}", label);
        if let Some(children) = &out.tree.children {
            print_nodes(children, "");
        }
        if let Some(stats) = &out.stats {
            println!();
            println!(
                "{} files, {} directories, {}",
                stats.file_count,
                stats.directory_count,
                format_size(stats.total_size)
            );
            println!(
                "Required files: {}/{}",
                stats.required_present, stats.required_total
            );
        }
    })
}

fn print_nodes(nodes: &[FileTreeNode], prefix: &str) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { "└── " } else { "├── " };
        let suffix = if node.is_dir() { "/" } else { "" };
        println!("{}{}{}{}", prefix, branch, node.name, suffix);
        if let Some(children) = &node.children {
            let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
            print_nodes(children, &next);
        }
    }
}

pub fn run_cat(cli: &Cli, idea: &str, path: &str) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    let content = store.get_file_content(idea, path)?;
    print_content(cli, ContentOutput::new(idea, path, None, content))
}

/// Raw bytes to stdout in human mode, envelope in JSON mode
pub(crate) fn print_content(cli: &Cli, output: ContentOutput) -> Result<(), RepoError> {
    if cli.json || cli.quiet {
        return output_success(cli, output, |_| {});
    }
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&output.raw)?;
    stdout.flush()?;
    Ok(())
}

pub fn run_write(cli: &Cli, idea: &str, path: &str, content: Option<String>) -> Result<(), RepoError> {
    let bytes = match content {
        Some(text) => text.into_bytes(),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    let snapshot = store.update_file(idea, path, &bytes)?;

    let output = WriteOutput {
        idea_id: idea.to_string(),
        path: path.to_string(),
        size: bytes.len(),
        created: snapshot.is_none(),
        snapshot,
    };
    output_success(cli, output, |out| match &out.snapshot {
        Some(version) => println!(
            "Updated {} ({}), previous content saved as {}",
            out.path,
            format_size(out.size as u64),
            version.id
        ),
        None => println!("Created {} ({})", out.path, format_size(out.size as u64)),
    })
}

pub fn run_rm(cli: &Cli, idea: &str, path: &str) -> Result<(), RepoError> {
    let ctx = RepoContext::resolve(cli)?;
    let store = ctx.open_store();
    store.delete_file(idea, path)?;

    output_success(
        cli,
        RemoveOutput {
            idea_id: idea.to_string(),
            path: path.to_string(),
            deleted: true,
        },
        |out| println!("Deleted {}", out.path),
    )
}
