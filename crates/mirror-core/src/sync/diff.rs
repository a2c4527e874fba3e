//! Classification of remote items against the cache

use serde::Serialize;

use crate::domain::RemoteItem;
use crate::manifest::CacheEntry;

/// How a remote item relates to what is cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Nothing cached for the key
    New,
    /// Cached, but possibly stale or missing from disk
    Changed,
    /// Cached copy is current; no transfer needed
    Unchanged,
}

/// Decide what to do with `item`.
///
/// `artifact_exists` reports whether the item's local file is present.
pub fn classify(item: &RemoteItem, entry: Option<&CacheEntry>, artifact_exists: bool) -> ItemStatus {
    let Some(entry) = entry else {
        return ItemStatus::New;
    };
    if !artifact_exists {
        return ItemStatus::Changed;
    }
    if item
        .descriptor_fingerprint()
        .is_some_and(|fingerprint| fingerprint == entry.fingerprint)
    {
        return ItemStatus::Unchanged;
    }
    if item
        .validator
        .as_ref()
        .is_some_and(|validator| !validator.is_empty() && *validator == entry.validator)
    {
        return ItemStatus::Unchanged;
    }
    ItemStatus::Changed
}
