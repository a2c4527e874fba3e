//! Content tree domain
//!
//! The content index lists every node as an object carrying at least a
//! `path`. Each node is fetched as a JSON document from the nodes path and
//! stored as `<path>.json`. The index itself is kept as the `_index` item,
//! which the content tree cannot be built without.

use async_trait::async_trait;
use bytes::Bytes;
use mirror_fetch::Fetcher;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{DomainKind, DomainSource, RemoteItem, enumeration_error, locate};
use crate::Result;
use crate::config::DomainSettings;

/// Key under which the content index is mirrored.
pub const INDEX_KEY: &str = "_index";

#[derive(Debug, Deserialize)]
struct ContentIndex {
    nodes: Vec<Value>,
}

pub struct ContentSource {
    index_url: String,
    origin: Url,
    nodes_path: String,
    critical: Vec<String>,
}

impl ContentSource {
    pub fn new(origin: &Url, settings: &DomainSettings) -> Self {
        let kind = DomainKind::Content;
        Self {
            index_url: locate(origin, settings.index_path(kind)),
            origin: origin.clone(),
            nodes_path: settings.files_path(kind).trim_matches('/').to_string(),
            critical: settings.critical.clone(),
        }
    }

    fn node_item(&self, node: Value) -> Option<RemoteItem> {
        let Some(path) = node.get("path").and_then(Value::as_str) else {
            warn!("Skipping content node without a path: {}", node);
            return None;
        };
        let key = path.trim_matches('/').to_string();
        let locator = locate(&self.origin, &format!("{}/{}.json", self.nodes_path, key));
        let mut item = RemoteItem::remote(key, locator).with_descriptor(node);
        if self.critical.contains(&item.key) {
            item = item.critical();
        }
        Some(item)
    }
}

#[async_trait]
impl DomainSource for ContentSource {
    fn kind(&self) -> DomainKind {
        DomainKind::Content
    }

    async fn enumerate(&self, fetcher: &Fetcher) -> Result<Vec<RemoteItem>> {
        let (index, raw): (ContentIndex, Bytes) = fetcher
            .fetch_json(&self.index_url)
            .await
            .map_err(|e| enumeration_error(self.kind(), e))?;
        debug!("Content index lists {} nodes", index.nodes.len());

        let index_item = RemoteItem::inline(INDEX_KEY, raw.clone())
            .with_descriptor(serde_json::from_slice(&raw)?)
            .critical();

        let mut items = Vec::with_capacity(index.nodes.len() + 1);
        items.push(index_item);
        items.extend(index.nodes.into_iter().filter_map(|node| self.node_item(node)));
        Ok(items)
    }

    fn validate(&self, _item: &RemoteItem, body: &[u8]) -> std::result::Result<(), String> {
        serde_json::from_slice::<Value>(body)
            .map(|_| ())
            .map_err(|e| format!("not a JSON document: {e}"))
    }
}
