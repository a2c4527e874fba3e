//! Per-domain run reports

use serde::Serialize;

use crate::domain::DomainKind;

/// Terminal state of a domain run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainStatus {
    /// Every item is mirrored
    Completed,
    /// The run finished but some items (or the listing) were skipped
    CompletedWithSkips,
    /// Enumeration, a critical item, or a write failed; the manifest is untouched
    Failed,
    /// The domain was not attempted
    Skipped,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::CompletedWithSkips => "completed-with-skips",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// An item that was not mirrored this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub key: String,
    /// Fetch attempts made, `0` when the item never reached the network
    pub attempts: u32,
    pub reason: String,
}

/// What happened to one domain
#[derive(Debug, Clone, Serialize)]
pub struct DomainReport {
    pub domain: DomainKind,
    pub status: DomainStatus,
    /// Keys whose payload was transferred and written
    pub fetched: Vec<String>,
    /// Keys confirmed current without a transfer
    pub unchanged: Vec<String>,
    pub skipped: Vec<SkippedItem>,
    /// Keys whose artifacts were removed as orphans
    pub removed: Vec<String>,
    pub bytes_fetched: u64,
    pub manifest_saved: bool,
    /// Warnings and failure details
    pub messages: Vec<String>,
}

impl DomainReport {
    pub(crate) fn new(domain: DomainKind) -> Self {
        Self {
            domain,
            status: DomainStatus::Completed,
            fetched: Vec::new(),
            unchanged: Vec::new(),
            skipped: Vec::new(),
            removed: Vec::new(),
            bytes_fetched: 0,
            manifest_saved: false,
            messages: Vec::new(),
        }
    }

    /// Report for a domain that was not attempted
    pub fn skipped(domain: DomainKind, reason: impl Into<String>) -> Self {
        Self {
            status: DomainStatus::Skipped,
            messages: vec![reason.into()],
            ..Self::new(domain)
        }
    }

    /// Report for a domain whose run failed
    pub fn failed(domain: DomainKind, error: impl Into<String>) -> Self {
        Self {
            status: DomainStatus::Failed,
            messages: vec![error.into()],
            ..Self::new(domain)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == DomainStatus::Failed
    }

    pub(crate) fn skip(&mut self, key: impl Into<String>, attempts: u32, reason: impl Into<String>) {
        self.skipped.push(SkippedItem {
            key: key.into(),
            attempts,
            reason: reason.into(),
        });
    }

    /// Settle the status from what was recorded
    pub(crate) fn finish(mut self) -> Self {
        self.fetched.sort();
        self.unchanged.sort();
        self.skipped.sort_by(|a, b| a.key.cmp(&b.key));
        self.status = if self.skipped.is_empty() {
            DomainStatus::Completed
        } else {
            DomainStatus::CompletedWithSkips
        };
        self
    }
}
