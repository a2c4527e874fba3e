//! Loading and saving manifests

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use super::{CacheManifest, MANIFEST_VERSION};
use crate::{Error, Result};

#[derive(Deserialize)]
struct VersionProbe {
    version: Option<u32>,
}

/// Manifest file of one domain
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest, starting cold when it is missing or unusable.
    ///
    /// Never fails: an unreadable, corrupt or foreign-version file yields an
    /// empty manifest, so the run proceeds as a cold start.
    pub fn load(&self) -> CacheManifest {
        match self.try_load() {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                debug!("No manifest at {}, starting cold", self.path.display());
                CacheManifest::new()
            }
            Err(e) => {
                warn!("Ignoring manifest, starting cold: {}", e);
                CacheManifest::new()
            }
        }
    }

    /// Load the manifest, reporting why it cannot be used.
    ///
    /// Returns `Ok(None)` when no manifest has been written yet.
    pub fn try_load(&self) -> Result<Option<CacheManifest>> {
        let Some(bytes) = mirror_fs::io::read_optional(&self.path)
            .map_err(|e| self.cache_error(e.to_string()))?
        else {
            return Ok(None);
        };

        let probe: VersionProbe = serde_json::from_slice(&bytes)
            .map_err(|e| self.cache_error(format!("corrupt manifest: {e}")))?;
        match probe.version {
            Some(MANIFEST_VERSION) => {}
            Some(other) => {
                return Err(self.cache_error(format!(
                    "unsupported manifest version {other} (expected {MANIFEST_VERSION})"
                )));
            }
            None => return Err(self.cache_error("manifest has no version")),
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| self.cache_error(format!("corrupt manifest: {e}")))
    }

    /// Persist `manifest`, replacing the previous file atomically.
    pub fn save(&self, manifest: &CacheManifest) -> Result<()> {
        let mut content = serde_json::to_vec_pretty(manifest)
            .map_err(|e| self.cache_error(e.to_string()))?;
        content.push(b'\n');
        mirror_fs::io::write_atomic(&self.path, &content)
            .map_err(|e| self.cache_error(e.to_string()))?;
        debug!(
            "Saved manifest with {} entries to {}",
            manifest.len(),
            self.path.display()
        );
        Ok(())
    }

    fn cache_error(&self, message: impl Into<String>) -> Error {
        Error::CacheState {
            path: self.path.clone(),
            message: message.into(),
        }
    }
}
