use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "humanet-repo", about = "Manage Humanet idea repositories", version)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress human-readable output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Override the storage root directory
    #[arg(long, global = true)]
    pub storage_root: Option<PathBuf>,

    /// Config file (default: ./humanet-repo.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scaffold a new repository for an idea
    Create {
        idea: String,

        /// Template (basic, research, technical)
        #[arg(long, default_value = "basic")]
        template: String,
    },

    /// Report whether an idea has a repository
    Exists { idea: String },

    /// Delete a repository with all files and histories
    Delete { idea: String },

    /// List one directory level
    Ls {
        idea: String,

        /// Directory inside the repository (default: root)
        #[arg(default_value = "")]
        path: String,
    },

    /// Show the file tree
    Tree {
        idea: String,

        /// Directory inside the repository (default: root)
        #[arg(default_value = "")]
        path: String,

        /// Levels to expand (default from config)
        #[arg(long)]
        depth: Option<usize>,

        /// Include file and required-file counts
        #[arg(long)]
        stats: bool,
    },

    /// Print a file's current content
    Cat { idea: String, path: String },

    /// Write a file, recording the previous content in its history
    Write {
        idea: String,
        path: String,

        /// Content to write (reads stdin if omitted)
        #[arg(long)]
        content: Option<String>,
    },

    /// Delete a non-required file or directory
    Rm { idea: String, path: String },

    /// List a file's saved versions, newest first
    History { idea: String, path: String },

    /// Print the content of a saved version
    Show {
        idea: String,
        path: String,
        version: String,
    },

    /// Restore a saved version as the file's current content
    Restore {
        idea: String,
        path: String,
        version: String,
    },

    /// Check required files and the history store
    Check { idea: String },

    /// Show the effective storage configuration
    Config {
        /// Save the effective configuration to this TOML file
        #[arg(long, value_name = "FILE")]
        write: Option<PathBuf>,
    },
}
