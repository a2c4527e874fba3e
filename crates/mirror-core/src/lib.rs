//! Synchronization engine for CMS Mirror
//!
//! This crate mirrors remote CMS content into a local directory tree ahead of
//! a static site build, implementing:
//!
//! - **Cache state**: a versioned manifest per domain recording what is cached
//! - **Domains**: content tree, fonts and media, each enumerated from an index
//! - **Orchestration**: load → enumerate → diff → fetch → write → reconcile → persist
//! - **Reconciliation**: removal of local artifacts no longer listed remotely
//!
//! # Architecture
//!
//! `mirror-core` sits above the Layer 0 crates and below the CLI:
//!
//! ```text
//!                 mirror-cli
//!                     |
//!                mirror-core
//!                     |
//!          +----------+----------+
//!          |                     |
//!     mirror-fs             mirror-fetch
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mirror_core::{Mirror, MirrorConfig, RunContext};
//! use mirror_fetch::HttpTransport;
//!
//! async fn build() -> mirror_core::Result<()> {
//!     let config = MirrorConfig::from_toml_str(r#"origin = "https://cms.example.com""#)?;
//!     let ctx = RunContext::new(config, Arc::new(HttpTransport::new()?))?;
//!     let summary = Mirror::new(&ctx).run().await;
//!     assert!(!summary.has_failures());
//!     Ok(())
//! }
//! ```

pub mod asset_index;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod mirror;
pub mod reconcile;
pub mod sync;

pub use asset_index::{AssetIndex, AssetRecord};
pub use config::{DomainSettings, FetchSettings, MirrorConfig};
pub use context::RunContext;
pub use domain::{DomainKind, DomainSource, Payload, RemoteItem};
pub use error::{Error, Result};
pub use manifest::{CacheEntry, CacheManifest, MANIFEST_VERSION, ManifestStore};
pub use mirror::{Mirror, RunSummary};
pub use reconcile::{NamingConvention, ReconcileReport, Reconciler, RemovedArtifact};
pub use sync::{DomainReport, DomainStatus, DomainSync, ItemStatus, SkippedItem};
