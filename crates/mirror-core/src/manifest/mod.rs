//! Cache state for one domain
//!
//! The manifest records, for every item mirrored locally, what was fetched
//! and when. It is the only thing a run consults to decide whether an item
//! can be skipped, and it is only ever replaced wholesale.

mod store;

pub use store::ManifestStore;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mirror_fetch::Validator;
use serde::{Deserialize, Serialize};

/// Current manifest format version
pub const MANIFEST_VERSION: u32 = 1;

/// What is known about one cached item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Descriptor fingerprint, or payload fingerprint when the listing has none
    pub fingerprint: String,

    /// Origin validator from the last transfer
    #[serde(flatten)]
    pub validator: Validator,

    /// Payload size in bytes
    pub size: u64,

    /// Last time the item was confirmed current
    pub checked_at: DateTime<Utc>,

    /// Last time the payload was transferred
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Entry for a payload transferred at `now`
    pub fn fetched(
        fingerprint: impl Into<String>,
        validator: Validator,
        size: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            validator,
            size,
            checked_at: now,
            fetched_at: now,
        }
    }

    /// Same entry, confirmed current at `now`
    pub fn revalidated(&self, now: DateTime<Utc>) -> Self {
        Self {
            checked_at: now,
            ..self.clone()
        }
    }

    /// Entry confirmed current at `now`, now described by `fingerprint`
    pub fn confirmed(&self, fingerprint: String, now: DateTime<Utc>) -> Self {
        Self {
            fingerprint,
            checked_at: now,
            ..self.clone()
        }
    }

    /// The stored validator, if it can be used for a conditional request
    pub fn conditional(&self) -> Option<&Validator> {
        (!self.validator.is_empty()).then_some(&self.validator)
    }
}

/// Persisted cache state of a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheManifest {
    pub version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,

    /// Fingerprint of the configuration the entries were produced under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,

    #[serde(default)]
    pub entries: BTreeMap<String, CacheEntry>,
}

impl Default for CacheManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheManifest {
    /// Empty manifest at the current version
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION,
            last_sync: None,
            config_hash: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total payload bytes across all entries
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }
}
