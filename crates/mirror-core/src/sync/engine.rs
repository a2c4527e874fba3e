//! Per-domain sync pass
//!
//! One pass walks the stages load → enumerate → diff → fetch → write →
//! reconcile → persist. Items are fetched concurrently, but the new manifest
//! is assembled from the keyed results, so its content never depends on the
//! order in which fetches complete. Fetched payloads are staged in memory and
//! only committed to disk once no critical item has failed.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::future::join_all;
use mirror_fetch::{FetchOutcome, Fetcher, Validator};
use tracing::{debug, info, warn};

use super::diff::{ItemStatus, classify};
use super::report::{DomainReport, DomainStatus};
use crate::asset_index::AssetIndex;
use crate::context::RunContext;
use crate::domain::{DomainSource, Payload, RemoteItem};
use crate::manifest::{CacheEntry, CacheManifest, MANIFEST_VERSION, ManifestStore};
use crate::{Error, Result};

/// An enumerated item with its local path and classification
struct Planned {
    item: RemoteItem,
    path: PathBuf,
    artifact_exists: bool,
    status: ItemStatus,
}

enum ItemOutcome {
    /// Cached copy confirmed current
    Current(CacheEntry),
    /// New payload, validated but not yet on disk
    Staged { entry: CacheEntry, body: Bytes },
    Failed { attempts: u32, reason: String },
}

/// Synchronizes one domain
pub struct DomainSync<'a> {
    ctx: &'a RunContext,
    source: &'a dyn DomainSource,
}

impl<'a> DomainSync<'a> {
    pub fn new(ctx: &'a RunContext, source: &'a dyn DomainSource) -> Self {
        Self { ctx, source }
    }

    /// Run one pass over the domain.
    ///
    /// # Errors
    ///
    /// Enumeration failures (outside tolerant mode), critical item failures
    /// and artifact write failures end the pass without saving the manifest.
    /// Everything else is recorded in the returned report.
    pub async fn run(&self) -> Result<DomainReport> {
        let kind = self.source.kind();
        let root = self.ctx.domain_root(kind);
        let store = ManifestStore::new(self.ctx.manifest_path(kind));
        let config_hash = self.ctx.config().domain_fingerprint(kind);
        let now = self.ctx.started_at();

        info!("Syncing {} into {}", kind, root.display());

        let mut previous = store.load();
        if !previous.is_empty() && previous.config_hash.as_deref() != Some(config_hash.as_str()) {
            info!(
                "{} configuration changed since the last sync, discarding {} cached entries",
                kind,
                previous.len()
            );
            previous = CacheManifest::new();
        }

        let fetcher = self.ctx.fetcher();
        let items = match self.source.enumerate(&fetcher).await {
            Ok(items) => items,
            Err(e) if self.ctx.config().tolerant => {
                warn!("{}; keeping the previous {} mirror", e, kind);
                let mut report = DomainReport::new(kind);
                report.status = DomainStatus::CompletedWithSkips;
                report.messages.push(e.to_string());
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        let mut report = DomainReport::new(kind);
        let plan = self.plan(items, &previous, &root, &mut report)?;
        debug!(
            "{} plan: {} new, {} changed, {} unchanged",
            kind,
            plan.iter().filter(|p| p.status == ItemStatus::New).count(),
            plan.iter().filter(|p| p.status == ItemStatus::Changed).count(),
            plan.iter().filter(|p| p.status == ItemStatus::Unchanged).count()
        );

        let outcomes = join_all(
            plan.iter()
                .map(|planned| self.process(planned, &fetcher, &previous)),
        )
        .await;

        let mut entries = BTreeMap::new();
        let mut staged = Vec::new();
        for (planned, outcome) in plan.iter().zip(outcomes) {
            let key = &planned.item.key;
            match outcome {
                ItemOutcome::Current(entry) => {
                    report.unchanged.push(key.clone());
                    entries.insert(key.clone(), entry);
                }
                ItemOutcome::Staged { entry, body } => {
                    report.bytes_fetched += entry.size;
                    report.fetched.push(key.clone());
                    entries.insert(key.clone(), entry);
                    staged.push((planned, body));
                }
                ItemOutcome::Failed { attempts, reason } if planned.item.critical => {
                    return Err(Error::CriticalItem {
                        domain: kind,
                        key: key.clone(),
                        attempts,
                        reason,
                    });
                }
                ItemOutcome::Failed { attempts, reason } => {
                    warn!("Skipping {} item '{}': {}", kind, key, reason);
                    // The previous artifact is still on disk and still valid
                    if let Some(entry) = previous.get(key)
                        && planned.artifact_exists
                    {
                        entries.insert(key.clone(), entry.clone());
                    }
                    report.skip(key.clone(), attempts, reason);
                }
            }
        }

        for (planned, body) in staged {
            mirror_fs::io::write_atomic(&planned.path, &body).map_err(|source| Error::Write {
                key: planned.item.key.clone(),
                path: planned.path.clone(),
                source,
            })?;
            debug!("Wrote {} ({} bytes)", planned.path.display(), body.len());
        }

        let expected: BTreeSet<String> = plan.iter().map(|p| p.item.key.clone()).collect();
        match self.ctx.reconciler().reconcile(&expected, &root) {
            Ok(reconciled) => {
                for (path, reason) in &reconciled.failures {
                    report
                        .messages
                        .push(format!("could not remove {}: {}", path.display(), reason));
                }
                report.removed = reconciled.removed_keys();
            }
            Err(e) => {
                warn!("{}", e);
                report.messages.push(e.to_string());
            }
        }

        let manifest = CacheManifest {
            version: MANIFEST_VERSION,
            last_sync: Some(now),
            config_hash: Some(config_hash),
            entries,
        };
        match store.save(&manifest) {
            Ok(()) => report.manifest_saved = true,
            Err(e) => {
                warn!("{}", e);
                report.messages.push(e.to_string());
            }
        }

        let index = AssetIndex::build(kind, &manifest, now);
        if let Err(e) = index.write(&self.ctx.asset_index_path(kind)) {
            warn!("Failed to publish {} asset index: {}", kind, e);
            report.messages.push(e.to_string());
        }

        let report = report.finish();
        info!(
            "{} {}: {} fetched, {} unchanged, {} skipped, {} removed",
            kind,
            report.status.as_str(),
            report.fetched.len(),
            report.unchanged.len(),
            report.skipped.len(),
            report.removed.len()
        );
        Ok(report)
    }

    /// Validate keys, drop duplicates, and classify against the cache.
    fn plan(
        &self,
        items: Vec<RemoteItem>,
        previous: &CacheManifest,
        root: &Path,
        report: &mut DomainReport,
    ) -> Result<Vec<Planned>> {
        let kind = self.source.kind();
        let naming = self.source.naming();
        let mut seen = HashSet::new();
        let mut plan = Vec::with_capacity(items.len());

        for item in items {
            if let Err(e) = mirror_fs::validate_item_key(&item.key) {
                if item.critical {
                    return Err(Error::CriticalItem {
                        domain: kind,
                        key: item.key,
                        attempts: 0,
                        reason: e.to_string(),
                    });
                }
                warn!("Skipping {} item: {}", kind, e);
                report.skip(item.key, 0, e.to_string());
                continue;
            }
            if !seen.insert(item.key.clone()) {
                warn!(
                    "Duplicate {} key '{}' in listing, keeping the first occurrence",
                    kind, item.key
                );
                report
                    .messages
                    .push(format!("duplicate key '{}' ignored", item.key));
                continue;
            }

            let path = mirror_fs::key_path(root, &naming.file_name(&item.key));
            let artifact_exists = path.is_file();
            let status = classify(&item, previous.get(&item.key), artifact_exists);
            plan.push(Planned {
                item,
                path,
                artifact_exists,
                status,
            });
        }
        Ok(plan)
    }

    async fn process(
        &self,
        planned: &Planned,
        fetcher: &Fetcher,
        previous: &CacheManifest,
    ) -> ItemOutcome {
        let item = &planned.item;
        let now = self.ctx.started_at();
        let prior = previous.get(&item.key);

        if planned.status == ItemStatus::Unchanged
            && let Some(entry) = prior
        {
            return ItemOutcome::Current(entry.revalidated(now));
        }

        let (body, origin_validator) = match &item.payload {
            Payload::Inline(body) => (body.clone(), Validator::default()),
            Payload::Remote(locator) => {
                // A conditional request cannot restore a missing artifact
                let conditional = prior
                    .filter(|_| planned.artifact_exists)
                    .and_then(CacheEntry::conditional);
                match fetcher.fetch(locator, conditional).await {
                    Ok(FetchOutcome::Modified { body, validator }) => (body, validator),
                    Ok(FetchOutcome::NotModified) => {
                        return match prior {
                            Some(entry) => {
                                debug!("'{}' not modified", item.key);
                                // The origin vouched for the current descriptor
                                let fingerprint = item
                                    .descriptor_fingerprint()
                                    .unwrap_or_else(|| entry.fingerprint.clone());
                                ItemOutcome::Current(entry.confirmed(fingerprint, now))
                            }
                            None => ItemOutcome::Failed {
                                attempts: 1,
                                reason: "origin answered 304 without a cached copy".to_string(),
                            },
                        };
                    }
                    Err(e) => {
                        return ItemOutcome::Failed {
                            attempts: e.attempts(),
                            reason: e.to_string(),
                        };
                    }
                }
            }
        };

        if let Err(reason) = self.source.validate(item, &body) {
            return ItemOutcome::Failed {
                attempts: u32::from(matches!(item.payload, Payload::Remote(_))),
                reason: format!("invalid payload: {reason}"),
            };
        }

        let fingerprint = item
            .descriptor_fingerprint()
            .unwrap_or_else(|| mirror_fs::fingerprint_bytes(&body));

        // Same bytes as the artifact on disk: nothing to write
        if let Some(entry) = prior
            && planned.artifact_exists
            && entry.fingerprint == fingerprint
        {
            debug!("'{}' content unchanged", item.key);
            return ItemOutcome::Current(entry.revalidated(now));
        }

        let validator = item.validator.clone().unwrap_or(origin_validator);
        ItemOutcome::Staged {
            entry: CacheEntry::fetched(fingerprint, validator, body.len() as u64, now),
            body,
        }
    }
}
