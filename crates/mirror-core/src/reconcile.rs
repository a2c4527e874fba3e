//! Removal of local artifacts the origin no longer lists
//!
//! The reconciler walks a domain root, maps every file back to an item key,
//! and deletes files whose key was not enumerated this run. Directories left
//! empty are pruned. It refuses to touch any directory outside its allow-list.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// How item keys map to file names below a domain root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingConvention {
    /// Key `a/b` is stored as `a/b.json`
    JsonDocument,
    /// Key `a/b.woff2` is stored as `a/b.woff2`
    Verbatim,
}

impl NamingConvention {
    /// Relative file name for `key`
    pub fn file_name(&self, key: &str) -> String {
        match self {
            Self::JsonDocument => format!("{key}.json"),
            Self::Verbatim => key.to_string(),
        }
    }

    /// Key stored at `relative`, or `None` when the file cannot hold an item
    pub fn key_for(&self, relative: &str) -> Option<String> {
        let key = match self {
            Self::JsonDocument => relative.strip_suffix(".json")?,
            Self::Verbatim => relative,
        };
        mirror_fs::validate_item_key(key).ok()?;
        Some(key.to_string())
    }
}

/// A file removed during reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedArtifact {
    /// Key the file held, `None` for files that never mapped to an item
    pub key: Option<String>,
    pub path: PathBuf,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub removed: Vec<RemovedArtifact>,
    pub pruned_dirs: Vec<PathBuf>,
    /// Paths that could not be removed, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty() && self.pruned_dirs.is_empty() && self.failures.is_empty()
    }

    /// Keys of removed files that mapped to an item
    pub fn removed_keys(&self) -> Vec<String> {
        self.removed.iter().filter_map(|r| r.key.clone()).collect()
    }
}

/// Deletes orphans below a fixed set of domain roots
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    roots: Vec<(PathBuf, NamingConvention)>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow reconciliation of `root`, whose files follow `naming`
    pub fn allow(mut self, root: impl Into<PathBuf>, naming: NamingConvention) -> Self {
        self.roots.push((root.into(), naming));
        self
    }

    /// Delete every file below `root` whose key is not in `expected`.
    ///
    /// Running it twice with the same inputs removes nothing the second time.
    pub fn reconcile(&self, expected: &BTreeSet<String>, root: &Path) -> Result<ReconcileReport> {
        let naming = self
            .roots
            .iter()
            .find(|(allowed, _)| allowed == root)
            .map(|(_, naming)| *naming)
            .ok_or_else(|| Error::Reconciliation {
                root: root.to_path_buf(),
                message: "root is not an allowed domain root".to_string(),
            })?;

        let mut report = ReconcileReport::default();
        let metadata = match fs::symlink_metadata(root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Nothing to reconcile, {} does not exist", root.display());
                return Ok(report);
            }
            Err(e) => return Err(walk_error(root, e)),
        };
        if !metadata.is_dir() {
            return Err(Error::Reconciliation {
                root: root.to_path_buf(),
                message: "root is not a directory".to_string(),
            });
        }

        self.sweep(root, root, naming, expected, &mut report)?;

        if !report.removed.is_empty() {
            info!(
                "Removed {} orphaned file(s) under {}",
                report.removed.len(),
                root.display()
            );
        }
        Ok(report)
    }

    /// Remove orphans below `dir`; returns whether `dir` is now empty.
    fn sweep(
        &self,
        root: &Path,
        dir: &Path,
        naming: NamingConvention,
        expected: &BTreeSet<String>,
        report: &mut ReconcileReport,
    ) -> Result<bool> {
        let mut entries = fs::read_dir(dir)
            .map_err(|e| walk_error(dir, e))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| walk_error(dir, e))?;
        entries.sort();

        let mut remaining = 0usize;
        for path in entries {
            let file_type = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata.file_type(),
                Err(e) => {
                    report.failures.push((path, e.to_string()));
                    remaining += 1;
                    continue;
                }
            };

            if file_type.is_dir() {
                if self.sweep(root, &path, naming, expected, report)? {
                    match fs::remove_dir(&path) {
                        Ok(()) => report.pruned_dirs.push(path),
                        Err(e) => {
                            warn!("Failed to prune {}: {}", path.display(), e);
                            report.failures.push((path, e.to_string()));
                            remaining += 1;
                        }
                    }
                } else {
                    remaining += 1;
                }
                continue;
            }

            // Files and symlinks alike; links are never followed
            let key = mirror_fs::relative_key(root, &path).and_then(|rel| naming.key_for(&rel));
            if key.as_ref().is_some_and(|k| expected.contains(k)) {
                remaining += 1;
                continue;
            }

            match mirror_fs::io::remove_file(&path) {
                Ok(_) => {
                    debug!("Removed orphan {}", path.display());
                    report.removed.push(RemovedArtifact { key, path });
                }
                Err(e) => {
                    warn!("Failed to remove orphan {}: {}", path.display(), e);
                    report.failures.push((path, e.to_string()));
                    remaining += 1;
                }
            }
        }
        Ok(remaining == 0)
    }
}

fn walk_error(path: &Path, error: std::io::Error) -> Error {
    Error::Reconciliation {
        root: path.to_path_buf(),
        message: error.to_string(),
    }
}
