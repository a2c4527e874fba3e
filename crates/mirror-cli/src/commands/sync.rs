//! Sync command implementation

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use mirror_core::{DomainKind, DomainReport, DomainStatus, Mirror, RunContext, RunSummary};
use mirror_fetch::HttpTransport;

use super::load_config;
use crate::error::{CliError, Result};

/// Command-line overrides for a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub origin: Option<String>,
    pub domains: Vec<String>,
    pub tolerant: bool,
    pub keep_going: bool,
    pub json: bool,
}

/// Run the sync command
pub fn run_sync(config_path: Option<&Path>, options: SyncOptions) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(origin) = options.origin {
        config.origin = Some(origin);
    }
    if !options.domains.is_empty() {
        config.domains = options
            .domains
            .iter()
            .map(|d| d.parse::<DomainKind>())
            .collect::<mirror_core::Result<_>>()?;
    }
    config.tolerant |= options.tolerant;

    let transport = HttpTransport::new().map_err(mirror_core::Error::from)?;
    let ctx = RunContext::new(config, Arc::new(transport))?;

    if !options.json {
        match ctx.origin() {
            Some(origin) => println!("{} Mirroring from {}", "=>".blue().bold(), origin),
            None => println!(
                "{} No origin configured, nothing to mirror",
                "=>".yellow().bold()
            ),
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(Mirror::new(&ctx).run());

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.has_failures() && !options.keep_going {
        return Err(CliError::user(format!(
            "{} domain(s) failed",
            summary.count(DomainStatus::Failed)
        )));
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for report in &summary.domains {
        print_report(report);
    }
    println!();
    println!(
        "{} {} completed, {} with skips, {} failed, {} skipped in {:.1}s",
        "=>".blue().bold(),
        summary.count(DomainStatus::Completed),
        summary.count(DomainStatus::CompletedWithSkips),
        summary.count(DomainStatus::Failed),
        summary.count(DomainStatus::Skipped),
        summary.elapsed.as_secs_f64()
    );
}

fn print_report(report: &DomainReport) {
    let label = match report.status {
        DomainStatus::Completed => "OK".green().bold(),
        DomainStatus::CompletedWithSkips => "PARTIAL".yellow().bold(),
        DomainStatus::Failed => "ERROR".red().bold(),
        DomainStatus::Skipped => "SKIPPED".dimmed(),
    };

    if report.status == DomainStatus::Skipped || report.status == DomainStatus::Failed {
        println!("{} {}", label, report.domain);
    } else {
        println!(
            "{} {}: {} fetched, {} unchanged, {} removed ({})",
            label,
            report.domain,
            report.fetched.len(),
            report.unchanged.len(),
            report.removed.len(),
            format_bytes(report.bytes_fetched)
        );
    }

    for item in &report.skipped {
        println!("   {} {} ({})", "-".yellow(), item.key, item.reason);
    }
    for message in &report.messages {
        println!("   {}", message.dimmed());
    }
}

/// Human-readable byte count
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
