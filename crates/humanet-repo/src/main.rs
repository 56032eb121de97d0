mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use cli::{Cli, Command};
use libhumanet_repo::RepoError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = run_command(&cli);

    if let Err(e) = result {
        output::output_error(&cli, &e);
        std::process::exit(e.exit_code());
    }
}

/// Logs go to stderr so stdout stays parseable
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_command(cli: &Cli) -> Result<(), RepoError> {
    match &cli.command {
        Command::Create { idea, template } => commands::repo::run_create(cli, idea, template),
        Command::Exists { idea } => commands::repo::run_exists(cli, idea),
        Command::Delete { idea } => commands::repo::run_delete(cli, idea),
        Command::Check { idea } => commands::repo::run_check(cli, idea),
        Command::Config { write } => commands::config::run(cli, write.as_deref()),
        Command::Ls { idea, path } => commands::files::run_ls(cli, idea, path),
        Command::Tree { idea, path, depth, stats } => {
            commands::files::run_tree(cli, idea, path, *depth, *stats)
        }
        Command::Cat { idea, path } => commands::files::run_cat(cli, idea, path),
        Command::Write { idea, path, content } => {
            commands::files::run_write(cli, idea, path, content.clone())
        }
        Command::Rm { idea, path } => commands::files::run_rm(cli, idea, path),
        Command::History { idea, path } => commands::history::run_history(cli, idea, path),
        Command::Show { idea, path, version } => {
            commands::history::run_show(cli, idea, path, version)
        }
        Command::Restore { idea, path, version } => {
            commands::history::run_restore(cli, idea, path, version)
        }
    }
}
