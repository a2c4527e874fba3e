//! CMS Mirror CLI
//!
//! Mirrors content, fonts, and media from a CMS origin into a local tree.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Debug output with -v, otherwise honour RUST_LOG and default to run progress
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,mirror_core=info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CliError::user(format!("failed to set up logging: {e}")))?;
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Some(Commands::Sync {
            origin,
            domains,
            tolerant,
            keep_going,
            json,
        }) => commands::run_sync(
            cli.config.as_deref(),
            commands::SyncOptions {
                origin,
                domains,
                tolerant,
                keep_going,
                json,
            },
        ),
        Some(Commands::Status { json }) => commands::run_status(cli.config.as_deref(), json),
        None => {
            println!("{} CMS Mirror", "cms-mirror".green().bold());
            println!();
            println!("Run {} for available commands.", "cms-mirror --help".cyan());
            Ok(())
        }
    }
}
