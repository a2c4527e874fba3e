//! Font files domain
//!
//! The font index is `{"files": [...]}` where each entry is either a bare
//! relative path or `{"path": ..., "hash": ...}`. Hashed entries carry a
//! descriptor; bare ones are compared by content after fetching.

use async_trait::async_trait;
use mirror_fetch::Fetcher;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{DomainKind, DomainSource, RemoteItem, enumeration_error, locate};
use crate::Result;
use crate::config::DomainSettings;

#[derive(Debug, Deserialize)]
struct FontIndex {
    files: Vec<FontEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FontEntry {
    Bare(String),
    Hashed { path: String, hash: Option<String> },
}

impl FontEntry {
    fn into_parts(self) -> (String, Option<String>) {
        match self {
            Self::Bare(path) => (path, None),
            Self::Hashed { path, hash } => (path, hash),
        }
    }
}

pub struct FontSource {
    index_url: String,
    origin: Url,
    files_path: String,
    critical: Vec<String>,
}

impl FontSource {
    pub fn new(origin: &Url, settings: &DomainSettings) -> Self {
        let kind = DomainKind::Fonts;
        Self {
            index_url: locate(origin, settings.index_path(kind)),
            origin: origin.clone(),
            files_path: settings.files_path(kind).trim_matches('/').to_string(),
            critical: settings.critical.clone(),
        }
    }

    fn item(&self, entry: FontEntry) -> RemoteItem {
        let (path, hash) = entry.into_parts();
        let key = path.trim_matches('/').to_string();
        let locator = locate(&self.origin, &format!("{}/{}", self.files_path, key));
        let mut item = RemoteItem::remote(key, locator);
        if let Some(hash) = hash {
            let descriptor = json!({ "path": item.key, "hash": hash });
            item = item.with_descriptor(descriptor);
        }
        if self.critical.contains(&item.key) {
            item = item.critical();
        }
        item
    }
}

#[async_trait]
impl DomainSource for FontSource {
    fn kind(&self) -> DomainKind {
        DomainKind::Fonts
    }

    async fn enumerate(&self, fetcher: &Fetcher) -> Result<Vec<RemoteItem>> {
        let (index, _): (FontIndex, _) = fetcher
            .fetch_json(&self.index_url)
            .await
            .map_err(|e| enumeration_error(self.kind(), e))?;
        debug!("Font index lists {} files", index.files.len());
        Ok(index.files.into_iter().map(|entry| self.item(entry)).collect())
    }

    fn validate(&self, item: &RemoteItem, body: &[u8]) -> std::result::Result<(), String> {
        if body.is_empty() {
            return Err("empty font file".to_string());
        }
        let extension = item
            .key
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        let expected: &[&[u8]] = match extension.as_deref() {
            Some("woff2") => &[b"wOF2"],
            Some("woff") => &[b"wOFF"],
            Some("otf") => &[b"OTTO"],
            Some("ttf") => &[b"\x00\x01\x00\x00", b"true"],
            Some("ttc") => &[b"ttcf"],
            // Stylesheets and licenses ship alongside font files
            _ => return Ok(()),
        };
        if expected.iter().any(|magic| body.starts_with(magic)) {
            Ok(())
        } else {
            Err(format!(
                "payload does not look like a .{} font",
                extension.unwrap_or_default()
            ))
        }
    }
}
