//! Top-level mirror configuration parsed from TOML

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use super::FetchSettings;
use crate::domain::DomainKind;
use crate::{Error, Result};

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "cms-mirror.toml";

fn default_mirror_root() -> PathBuf {
    PathBuf::from(".cms-mirror/data")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".cms-mirror/state")
}

fn default_domains() -> Vec<DomainKind> {
    DomainKind::ALL.to_vec()
}

/// Per-domain section (`[content]`, `[fonts]`, `[media]`).
///
/// Unset paths fall back to the domain's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainSettings {
    /// Origin path of the item list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_path: Option<String>,

    /// Origin path below which items are served (`nodes_path` for content)
    #[serde(default, alias = "nodes_path", skip_serializing_if = "Option::is_none")]
    pub files_path: Option<String>,

    /// Keys whose failure fails the whole domain
    #[serde(default)]
    pub critical: Vec<String>,
}

impl DomainSettings {
    pub fn index_path(&self, kind: DomainKind) -> &str {
        self.index_path
            .as_deref()
            .unwrap_or_else(|| kind.default_index_path())
    }

    pub fn files_path(&self, kind: DomainKind) -> &str {
        self.files_path
            .as_deref()
            .unwrap_or_else(|| kind.default_files_path())
    }
}

/// Complete configuration for one mirror run
///
/// # Example
///
/// ```
/// use mirror_core::MirrorConfig;
///
/// let config = MirrorConfig::from_toml_str(r#"
/// origin = "https://cms.example.com"
/// domains = ["content", "media"]
///
/// [fetch]
/// concurrency = 8
///
/// [content]
/// critical = ["home"]
/// "#).unwrap();
///
/// assert_eq!(config.fetch.concurrency, 8);
/// assert_eq!(config.content.critical, vec!["home".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorConfig {
    /// Base URL of the CMS; domains are skipped when absent
    #[serde(default)]
    pub origin: Option<String>,

    #[serde(default = "default_mirror_root")]
    pub mirror_root: PathBuf,

    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default = "default_domains")]
    pub domains: Vec<DomainKind>,

    /// Keep previous artifacts when a listing cannot be obtained
    #[serde(default)]
    pub tolerant: bool,

    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default)]
    pub content: DomainSettings,

    #[serde(default)]
    pub fonts: DomainSettings,

    #[serde(default)]
    pub media: DomainSettings,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            origin: None,
            mirror_root: default_mirror_root(),
            state_dir: default_state_dir(),
            domains: default_domains(),
            tolerant: false,
            fetch: FetchSettings::default(),
            content: DomainSettings::default(),
            fonts: DomainSettings::default(),
            media: DomainSettings::default(),
        }
    }
}

impl MirrorConfig {
    /// Parse a configuration from TOML content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if it exists, otherwise start from defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn domain(&self, kind: DomainKind) -> &DomainSettings {
        match kind {
            DomainKind::Content => &self.content,
            DomainKind::Fonts => &self.fonts,
            DomainKind::Media => &self.media,
        }
    }

    /// Local directory mirroring `kind`
    pub fn domain_root(&self, kind: DomainKind) -> PathBuf {
        self.mirror_root.join(kind.as_str())
    }

    pub fn manifest_path(&self, kind: DomainKind) -> PathBuf {
        self.state_dir
            .join(format!("{}.manifest.json", kind.as_str()))
    }

    pub fn asset_index_path(&self, kind: DomainKind) -> PathBuf {
        self.mirror_root
            .join(format!("{}-assets.json", kind.as_str()))
    }

    /// Enabled domains, in declaration order without repeats
    pub fn enabled_domains(&self) -> Vec<DomainKind> {
        let mut enabled = Vec::new();
        for kind in &self.domains {
            if !enabled.contains(kind) {
                enabled.push(*kind);
            }
        }
        enabled
    }

    /// Parsed origin, `None` when not configured
    pub fn origin_url(&self) -> Result<Option<Url>> {
        let Some(origin) = self.origin.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if origin.is_empty() {
            return Ok(None);
        }
        let url = Url::parse(origin)
            .map_err(|e| Error::configuration(format!("invalid origin '{origin}': {e}")))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::configuration(format!(
                    "origin '{origin}' must use http or https, not {other}"
                )));
            }
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(Error::configuration(format!(
                "origin '{origin}' has no host"
            )));
        }
        Ok(Some(url))
    }

    /// Check everything that can be checked without I/O
    pub fn validate(&self) -> Result<()> {
        self.origin_url()?;

        if self.fetch.concurrency == 0 {
            return Err(Error::configuration("fetch.concurrency must be at least 1"));
        }
        if self.fetch.timeout_ms == 0 {
            return Err(Error::configuration("fetch.timeout_ms must be positive"));
        }
        if self.mirror_root.as_os_str().is_empty() {
            return Err(Error::configuration("mirror_root must not be empty"));
        }
        if self.state_dir.as_os_str().is_empty() {
            return Err(Error::configuration("state_dir must not be empty"));
        }
        if self.state_dir.starts_with(&self.mirror_root)
            || self.mirror_root.starts_with(&self.state_dir)
        {
            return Err(Error::configuration(format!(
                "mirror_root ({}) and state_dir ({}) must not contain one another",
                self.mirror_root.display(),
                self.state_dir.display()
            )));
        }
        for kind in DomainKind::ALL {
            for key in &self.domain(kind).critical {
                mirror_fs::validate_item_key(key).map_err(|e| {
                    Error::configuration(format!("{kind}.critical entry '{key}': {e}"))
                })?;
            }
        }
        Ok(())
    }

    /// Fingerprint of everything that decides what a domain mirrors.
    ///
    /// A manifest written under a different fingerprint is discarded.
    pub fn domain_fingerprint(&self, kind: DomainKind) -> String {
        let settings = self.domain(kind);
        mirror_fs::fingerprint_value(&json!({
            "domain": kind.as_str(),
            "origin": self.origin.as_deref().map(str::trim),
            "indexPath": settings.index_path(kind),
            "filesPath": settings.files_path(kind),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_file_yields_defaults() {
        let config = MirrorConfig::from_toml_str("").unwrap();
        assert_eq!(config, MirrorConfig::default());
        assert_eq!(config.enabled_domains(), DomainKind::ALL.to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn domain_paths_fall_back_per_domain() {
        let config = MirrorConfig::from_toml_str(
            r#"
            [content]
            nodes_path = "api/nodes"
            "#,
        )
        .unwrap();
        assert_eq!(config.content.index_path(DomainKind::Content), "content/index.json");
        assert_eq!(config.content.files_path(DomainKind::Content), "api/nodes");
        assert_eq!(config.media.files_path(DomainKind::Media), "media/files");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(MirrorConfig::from_toml_str("orign = \"https://x\"").is_err());
        assert!(MirrorConfig::from_toml_str("domains = [\"video\"]").is_err());
    }

    #[test]
    fn duplicate_domains_run_once() {
        let config = MirrorConfig::from_toml_str(r#"domains = ["media", "content", "media"]"#)
            .unwrap();
        assert_eq!(
            config.enabled_domains(),
            vec![DomainKind::Media, DomainKind::Content]
        );
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://cms.test")]
    #[case("mailto:ops@cms.test")]
    fn invalid_origins_fail_validation(#[case] origin: &str) {
        let config = MirrorConfig {
            origin: Some(origin.to_string()),
            ..MirrorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration { .. })));
    }

    #[test]
    fn blank_origin_is_treated_as_missing() {
        let config = MirrorConfig {
            origin: Some("  ".into()),
            ..MirrorConfig::default()
        };
        assert!(config.origin_url().unwrap().is_none());
    }

    #[test]
    fn zero_concurrency_or_timeout_fail_validation() {
        let mut config = MirrorConfig::default();
        config.fetch.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = MirrorConfig::default();
        config.fetch.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn nested_roots_fail_validation() {
        let config = MirrorConfig {
            mirror_root: "out".into(),
            state_dir: "out/state".into(),
            ..MirrorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_critical_keys_fail_validation() {
        let mut config = MirrorConfig::default();
        config.fonts.critical = vec!["../escape.woff2".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn domain_fingerprint_tracks_origin_and_paths() {
        let a = MirrorConfig {
            origin: Some("https://a.test".into()),
            ..MirrorConfig::default()
        };
        let b = MirrorConfig {
            origin: Some("https://b.test".into()),
            ..MirrorConfig::default()
        };
        let mut tuned = a.clone();
        tuned.fetch.concurrency = 16;

        assert_ne!(
            a.domain_fingerprint(DomainKind::Content),
            b.domain_fingerprint(DomainKind::Content)
        );
        assert_ne!(
            a.domain_fingerprint(DomainKind::Content),
            a.domain_fingerprint(DomainKind::Fonts)
        );
        assert_eq!(
            a.domain_fingerprint(DomainKind::Media),
            tuned.domain_fingerprint(DomainKind::Media)
        );
    }
}
