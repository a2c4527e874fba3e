//! Remote item domains
//!
//! A domain is one class of remote items mirrored into its own local root.
//! Each domain knows how to enumerate its items from the origin, how keys map
//! to local files, and what a well-formed payload looks like.

mod content;
mod fonts;
mod media;

pub use content::ContentSource;
pub use fonts::FontSource;
pub use media::MediaSource;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use mirror_fetch::{Fetcher, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::DomainSettings;
use crate::reconcile::NamingConvention;
use crate::{Error, Result};

/// The domains a mirror run can cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainKind {
    Content,
    Fonts,
    Media,
}

impl DomainKind {
    pub const ALL: [DomainKind; 3] = [DomainKind::Content, DomainKind::Fonts, DomainKind::Media];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Fonts => "fonts",
            Self::Media => "media",
        }
    }

    /// Origin path of the domain's item list when none is configured.
    pub fn default_index_path(&self) -> &'static str {
        match self {
            Self::Content => "content/index.json",
            Self::Fonts => "fonts/index.json",
            Self::Media => "media/index.json",
        }
    }

    /// Origin path below which individual items are served.
    pub fn default_files_path(&self) -> &'static str {
        match self {
            Self::Content => "content/nodes",
            Self::Fonts => "fonts/files",
            Self::Media => "media/files",
        }
    }

    pub fn naming(&self) -> NamingConvention {
        match self {
            Self::Content => NamingConvention::JsonDocument,
            Self::Fonts | Self::Media => NamingConvention::Verbatim,
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "content" => Ok(Self::Content),
            "fonts" => Ok(Self::Fonts),
            "media" => Ok(Self::Media),
            other => Err(Error::configuration(format!(
                "unknown domain '{other}' (expected content, fonts or media)"
            ))),
        }
    }
}

/// Where an item's bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Fetched from this URL
    Remote(String),
    /// Already in hand from enumeration
    Inline(Bytes),
}

/// A remote item as described by its domain's listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteItem {
    /// Stable identifier, unique within the domain
    pub key: String,
    pub payload: Payload,
    /// Listing metadata that changes whenever the item does
    pub descriptor: Option<Value>,
    /// Validator advertised by the listing
    pub validator: Option<Validator>,
    /// Whether failing this item fails the whole domain
    pub critical: bool,
}

impl RemoteItem {
    pub fn remote(key: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            payload: Payload::Remote(locator.into()),
            descriptor: None,
            validator: None,
            critical: false,
        }
    }

    pub fn inline(key: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            payload: Payload::Inline(body.into()),
            descriptor: None,
            validator: None,
            critical: false,
        }
    }

    pub fn with_descriptor(mut self, descriptor: Value) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        if !validator.is_empty() {
            self.validator = Some(validator);
        }
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Fingerprint of the descriptor, if the listing supplied one.
    pub fn descriptor_fingerprint(&self) -> Option<String> {
        self.descriptor.as_ref().map(mirror_fs::fingerprint_value)
    }
}

/// A source of remote items for one domain.
#[async_trait]
pub trait DomainSource: Send + Sync {
    fn kind(&self) -> DomainKind;

    fn naming(&self) -> NamingConvention {
        self.kind().naming()
    }

    /// List every item the origin currently publishes for this domain.
    async fn enumerate(&self, fetcher: &Fetcher) -> Result<Vec<RemoteItem>>;

    /// Check a fetched payload before it is committed to disk.
    fn validate(&self, item: &RemoteItem, body: &[u8]) -> std::result::Result<(), String>;
}

/// Build the source for `kind` against `origin`.
pub fn source_for(
    kind: DomainKind,
    origin: &Url,
    settings: &DomainSettings,
) -> Box<dyn DomainSource> {
    match kind {
        DomainKind::Content => Box::new(ContentSource::new(origin, settings)),
        DomainKind::Fonts => Box::new(FontSource::new(origin, settings)),
        DomainKind::Media => Box::new(MediaSource::new(origin, settings)),
    }
}

/// Join `path` onto the origin, normalizing through [`Url`] when possible.
pub(crate) fn locate(origin: &Url, path: &str) -> String {
    let joined = format!(
        "{}/{}",
        origin.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
        .map(String::from)
        .unwrap_or(joined)
}

pub(crate) fn enumeration_error(kind: DomainKind, source: mirror_fetch::FetchError) -> Error {
    Error::Enumeration {
        domain: kind,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("https://cms.test", "content/index.json", "https://cms.test/content/index.json")]
    #[case("https://cms.test/", "/content/index.json", "https://cms.test/content/index.json")]
    #[case("https://cms.test/api/", "fonts/files/a.woff2", "https://cms.test/api/fonts/files/a.woff2")]
    #[case("https://cms.test/api", "media/files/my photo.jpg", "https://cms.test/api/media/files/my%20photo.jpg")]
    fn locate_joins_origin_and_path(#[case] origin: &str, #[case] path: &str, #[case] expected: &str) {
        let origin = Url::parse(origin).unwrap();
        assert_eq!(locate(&origin, path), expected);
    }

    #[test]
    fn domain_kind_round_trips_through_str() {
        for kind in DomainKind::ALL {
            assert_eq!(kind.as_str().parse::<DomainKind>().unwrap(), kind);
        }
        assert!("assets".parse::<DomainKind>().is_err());
    }

    #[test]
    fn empty_listing_validator_is_dropped() {
        let item = RemoteItem::remote("a", "https://cms.test/a").with_validator(Validator::default());
        assert!(item.validator.is_none());
    }

    #[test]
    fn descriptor_fingerprint_ignores_key_order() {
        let a = RemoteItem::remote("a", "u").with_descriptor(json!({"path": "a", "rev": 2}));
        let b = RemoteItem::remote("a", "u").with_descriptor(json!({"rev": 2, "path": "a"}));
        assert_eq!(a.descriptor_fingerprint(), b.descriptor_fingerprint());
        assert!(RemoteItem::remote("a", "u").descriptor_fingerprint().is_none());
    }
}
