//! Domain synchronization
//!
//! This module provides:
//! - **diff**: Classify remote items as new, changed or unchanged
//! - **engine**: Run one sync pass over a domain
//! - **report**: Per-domain outcome and skipped items

mod diff;
mod engine;
mod report;

pub use diff::{ItemStatus, classify};
pub use engine::DomainSync;
pub use report::{DomainReport, DomainStatus, SkippedItem};
