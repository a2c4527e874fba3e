//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CMS Mirror - Mirror remote CMS content into a local tree before a site build
#[derive(Parser, Debug)]
#[command(name = "cms-mirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./cms-mirror.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Mirror the configured domains from the origin
    ///
    /// Examples:
    ///   cms-mirror sync                              # All domains from cms-mirror.toml
    ///   cms-mirror sync --origin https://cms.example # Override the origin
    ///   cms-mirror sync -d content -d media          # Only some domains
    Sync {
        /// Base URL of the CMS
        #[arg(long, env = "CMS_MIRROR_ORIGIN")]
        origin: Option<String>,

        /// Domains to mirror (repeatable)
        #[arg(
            short,
            long = "domain",
            value_name = "DOMAIN",
            value_parser = ["content", "fonts", "media"]
        )]
        domains: Vec<String>,

        /// Keep the previous mirror when a listing cannot be fetched
        #[arg(long)]
        tolerant: bool,

        /// Exit successfully even if a domain failed
        #[arg(long)]
        keep_going: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show what is currently mirrored
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
