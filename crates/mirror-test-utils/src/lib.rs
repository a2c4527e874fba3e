//! Shared test utilities for the cms-mirror workspace.
//!
//! This crate provides standardised test fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only - never published.
//!
//! # Modules
//!
//! - [`transport`] - [`ScriptedTransport`], an in-memory origin
//! - [`fixture`] - [`TestMirror`] temporary directory with mirror/state roots

pub mod fixture;
pub mod transport;

pub use fixture::TestMirror;
pub use transport::{RecordedRequest, Scripted, ScriptedTransport};
