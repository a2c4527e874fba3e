//! Status command implementation

use std::path::Path;

use chrono::{DateTime, Utc};
use colored::Colorize;
use mirror_core::{ManifestStore, MirrorConfig};
use serde::Serialize;

use super::load_config;
use super::sync::format_bytes;
use crate::error::Result;

/// Mirror state of one domain as recorded by its manifest
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DomainState {
    domain: String,
    manifest: String,
    present: bool,
    entries: usize,
    bytes: u64,
    last_sync: Option<DateTime<Utc>>,
    /// Written under a different origin or layout; the next sync refetches
    stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn inspect(config: &MirrorConfig) -> Vec<DomainState> {
    config
        .enabled_domains()
        .into_iter()
        .map(|kind| {
            let path = config.manifest_path(kind);
            let mut state = DomainState {
                domain: kind.to_string(),
                manifest: path.display().to_string(),
                present: false,
                entries: 0,
                bytes: 0,
                last_sync: None,
                stale: false,
                error: None,
            };
            match ManifestStore::new(&path).try_load() {
                Ok(Some(manifest)) => {
                    state.present = true;
                    state.entries = manifest.len();
                    state.bytes = manifest.total_size();
                    state.last_sync = manifest.last_sync;
                    state.stale = manifest.config_hash.as_deref()
                        != Some(config.domain_fingerprint(kind).as_str());
                }
                Ok(None) => {}
                Err(e) => state.error = Some(e.to_string()),
            }
            state
        })
        .collect()
}

/// Run the status command
pub fn run_status(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let states = inspect(&config);

    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    println!(
        "{}   {}",
        "Origin:".dimmed(),
        config.origin.as_deref().unwrap_or("(not configured)")
    );
    println!("{}   {}", "Mirror:".dimmed(), config.mirror_root.display());
    println!();

    for state in &states {
        if let Some(error) = &state.error {
            println!("{} {}: {}", "ERROR".red().bold(), state.domain, error);
        } else if !state.present {
            println!("{} {}: never synced", "-".dimmed(), state.domain);
        } else {
            let last_sync = state
                .last_sync
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "{} {}: {} items, {} (last sync {})",
                "OK".green().bold(),
                state.domain,
                state.entries,
                format_bytes(state.bytes),
                last_sync
            );
            if state.stale {
                println!(
                    "   {}",
                    "configuration changed since last sync; next sync refetches everything"
                        .yellow()
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::{CacheManifest, DomainKind};
    use mirror_test_utils::TestMirror;

    fn config(mirror: &TestMirror) -> MirrorConfig {
        MirrorConfig {
            origin: Some("https://cms.test".into()),
            mirror_root: mirror.mirror_root(),
            state_dir: mirror.state_dir(),
            domains: vec![DomainKind::Content, DomainKind::Fonts],
            ..MirrorConfig::default()
        }
    }

    #[test]
    fn test_inspect_reports_missing_and_stale_manifests() {
        let mirror = TestMirror::new();
        let config = config(&mirror);

        let mut manifest = CacheManifest::new();
        manifest.config_hash = Some("from-another-origin".into());
        ManifestStore::new(config.manifest_path(DomainKind::Content))
            .save(&manifest)
            .unwrap();

        let states = inspect(&config);
        assert_eq!(states.len(), 2);
        assert!(states[0].present);
        assert!(states[0].stale);
        assert!(!states[1].present);
        assert!(states[1].error.is_none());
    }

    #[test]
    fn test_inspect_surfaces_corrupt_manifest() {
        let mirror = TestMirror::new();
        let config = config(&mirror);
        std::fs::create_dir_all(mirror.state_dir()).unwrap();
        std::fs::write(config.manifest_path(DomainKind::Fonts), "{ nope").unwrap();

        let states = inspect(&config);
        assert!(states[1].error.as_deref().unwrap().contains("corrupt manifest"));
    }
}
