//! Asset index published for the site generator
//!
//! After each successful pass, `<mirror_root>/<domain>-assets.json` lists
//! every mirrored item with its path relative to the mirror root. The site
//! generator reads this file instead of the manifest.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::domain::DomainKind;
use crate::manifest::CacheManifest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Forward-slash path relative to the mirror root
    pub path: String,
    pub size: u64,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndex {
    pub domain: DomainKind,
    pub generated_at: DateTime<Utc>,
    pub assets: BTreeMap<String, AssetRecord>,
}

impl AssetIndex {
    pub fn build(kind: DomainKind, manifest: &CacheManifest, generated_at: DateTime<Utc>) -> Self {
        let naming = kind.naming();
        let assets = manifest
            .entries
            .iter()
            .map(|(key, entry)| {
                let record = AssetRecord {
                    path: format!("{}/{}", kind.as_str(), naming.file_name(key)),
                    size: entry.size,
                    fingerprint: entry.fingerprint.clone(),
                };
                (key.clone(), record)
            })
            .collect();
        Self {
            domain: kind,
            generated_at,
            assets,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Write the index atomically
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut content = serde_json::to_vec_pretty(self)?;
        content.push(b'\n');
        mirror_fs::io::write_atomic(path, &content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::CacheEntry;
    use mirror_fetch::Validator;

    #[test]
    fn paths_follow_domain_naming() {
        let now = Utc::now();
        let mut manifest = CacheManifest::new();
        manifest.entries.insert(
            "blog/hello".into(),
            CacheEntry::fetched("sha256:a", Validator::default(), 5, now),
        );

        let content = AssetIndex::build(DomainKind::Content, &manifest, now);
        assert_eq!(content.assets["blog/hello"].path, "content/blog/hello.json");

        let media = AssetIndex::build(DomainKind::Media, &manifest, now);
        assert_eq!(media.assets["blog/hello"].path, "media/blog/hello");
        assert_eq!(media.assets["blog/hello"].size, 5);
    }
}
