//! Per-invocation run state

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mirror_fetch::{Fetcher, Transport};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::Result;
use crate::config::MirrorConfig;
use crate::domain::{self, DomainKind, DomainSource};
use crate::reconcile::Reconciler;

/// Everything a run needs, built once from a validated configuration.
///
/// Nothing here outlives the run; a new context is created per invocation.
pub struct RunContext {
    config: MirrorConfig,
    origin: Option<Url>,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

impl RunContext {
    /// Validate `config` and prepare a run against `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if the configuration is
    /// invalid. No I/O happens before this check.
    pub fn new(config: MirrorConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let origin = config.origin_url()?;
        Ok(Self {
            config,
            origin,
            transport,
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
        })
    }

    /// Pin the run's clock; every timestamp the run records uses it.
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn origin(&self) -> Option<&Url> {
        self.origin.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Root token; cancelling it abandons every pending fetch and backoff.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// A fetcher with its own concurrency budget, cancelled with the run.
    pub fn fetcher(&self) -> Fetcher {
        Fetcher::new(
            self.transport.clone(),
            self.config.fetch.to_options(),
            self.cancel.child_token(),
        )
    }

    /// Source for `kind`, or `None` when no origin is configured
    pub fn source(&self, kind: DomainKind) -> Option<Box<dyn DomainSource>> {
        let origin = self.origin.as_ref()?;
        Some(domain::source_for(kind, origin, self.config.domain(kind)))
    }

    pub fn domain_root(&self, kind: DomainKind) -> PathBuf {
        self.config.domain_root(kind)
    }

    pub fn manifest_path(&self, kind: DomainKind) -> PathBuf {
        self.config.manifest_path(kind)
    }

    pub fn asset_index_path(&self, kind: DomainKind) -> PathBuf {
        self.config.asset_index_path(kind)
    }

    /// Reconciler allowed to clean exactly the domain roots of this run
    pub fn reconciler(&self) -> Reconciler {
        DomainKind::ALL
            .into_iter()
            .fold(Reconciler::new(), |reconciler, kind| {
                reconciler.allow(self.domain_root(kind), kind.naming())
            })
    }
}
