//! Filesystem primitives for CMS Mirror
//!
//! Provides item key to path mapping, atomic artifact writes, and the
//! canonical content fingerprint used for change detection.

pub mod error;
pub mod fingerprint;
pub mod io;
pub mod path;

pub use error::{Error, Result};
pub use fingerprint::{canonical_json, fingerprint, fingerprint_bytes, fingerprint_value};
pub use path::{key_path, relative_key, validate_item_key};
