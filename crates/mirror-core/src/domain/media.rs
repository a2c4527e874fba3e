//! Media assets domain
//!
//! The media index is `{"assets": [{"path", "size", "etag"}]}`. The listing
//! etag doubles as the item's validator, so unchanged assets are recognized
//! without touching the origin, and the declared size is checked on arrival.

use async_trait::async_trait;
use mirror_fetch::{Fetcher, Validator};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{DomainKind, DomainSource, RemoteItem, enumeration_error, locate};
use crate::Result;
use crate::config::DomainSettings;

#[derive(Debug, Deserialize)]
struct MediaIndex {
    assets: Vec<MediaAsset>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MediaAsset {
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
}

pub struct MediaSource {
    index_url: String,
    origin: Url,
    files_path: String,
    critical: Vec<String>,
}

impl MediaSource {
    pub fn new(origin: &Url, settings: &DomainSettings) -> Self {
        let kind = DomainKind::Media;
        Self {
            index_url: locate(origin, settings.index_path(kind)),
            origin: origin.clone(),
            files_path: settings.files_path(kind).trim_matches('/').to_string(),
            critical: settings.critical.clone(),
        }
    }

    fn item(&self, mut asset: MediaAsset) -> Result<RemoteItem> {
        asset.path = asset.path.trim_matches('/').to_string();
        let locator = locate(&self.origin, &format!("{}/{}", self.files_path, asset.path));
        let validator = asset.etag.clone().map(Validator::etag);
        let descriptor = serde_json::to_value(&asset)?;

        let mut item = RemoteItem::remote(asset.path, locator).with_descriptor(descriptor);
        if let Some(validator) = validator {
            item = item.with_validator(validator);
        }
        if self.critical.contains(&item.key) {
            item = item.critical();
        }
        Ok(item)
    }
}

#[async_trait]
impl DomainSource for MediaSource {
    fn kind(&self) -> DomainKind {
        DomainKind::Media
    }

    async fn enumerate(&self, fetcher: &Fetcher) -> Result<Vec<RemoteItem>> {
        let (index, _): (MediaIndex, _) = fetcher
            .fetch_json(&self.index_url)
            .await
            .map_err(|e| enumeration_error(self.kind(), e))?;
        debug!("Media index lists {} assets", index.assets.len());
        index.assets.into_iter().map(|asset| self.item(asset)).collect()
    }

    fn validate(&self, item: &RemoteItem, body: &[u8]) -> std::result::Result<(), String> {
        let declared = item
            .descriptor
            .as_ref()
            .and_then(|d| d.get("size"))
            .and_then(serde_json::Value::as_u64);
        match declared {
            Some(size) if size != body.len() as u64 => Err(format!(
                "size mismatch: listing declares {size} bytes, received {}",
                body.len()
            )),
            _ => Ok(()),
        }
    }
}
