//! Multi-domain runner

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info};

use crate::context::RunContext;
use crate::domain::DomainKind;
use crate::sync::{DomainReport, DomainStatus, DomainSync};

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub domains: Vec<DomainReport>,
}

fn serialize_millis<S: serde::Serializer>(elapsed: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.domains.iter().any(DomainReport::is_failed)
    }

    pub fn report(&self, kind: DomainKind) -> Option<&DomainReport> {
        self.domains.iter().find(|r| r.domain == kind)
    }

    pub fn count(&self, status: DomainStatus) -> usize {
        self.domains.iter().filter(|r| r.status == status).count()
    }
}

/// Runs every enabled domain of a [`RunContext`]
pub struct Mirror<'a> {
    ctx: &'a RunContext,
}

impl<'a> Mirror<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Sync all enabled domains concurrently.
    ///
    /// A failing domain never affects the others; each owns its own subtree
    /// and manifest.
    pub async fn run(&self) -> RunSummary {
        let started = tokio::time::Instant::now();
        let domains = self.ctx.config().enabled_domains();
        let reports = join_all(domains.into_iter().map(|kind| self.run_domain(kind))).await;

        let summary = RunSummary {
            started_at: self.ctx.started_at(),
            elapsed: started.elapsed(),
            domains: reports,
        };
        info!(
            "Mirror run finished in {:?}: {} completed, {} with skips, {} failed, {} skipped",
            summary.elapsed,
            summary.count(DomainStatus::Completed),
            summary.count(DomainStatus::CompletedWithSkips),
            summary.count(DomainStatus::Failed),
            summary.count(DomainStatus::Skipped)
        );
        summary
    }

    /// Sync a single domain, folding errors into its report
    pub async fn run_domain(&self, kind: DomainKind) -> DomainReport {
        let Some(source) = self.ctx.source(kind) else {
            info!("No origin configured, skipping {}", kind);
            return DomainReport::skipped(kind, "origin not configured");
        };

        match DomainSync::new(self.ctx, source.as_ref()).run().await {
            Ok(report) => report,
            Err(e) => {
                error!("{} sync failed: {}", kind, e);
                DomainReport::failed(kind, e.to_string())
            }
        }
    }
}
