//! Content fingerprints
//!
//! A fingerprint is the SHA-256 digest of a canonical encoding, rendered in the
//! single format `sha256:<hex>` used by manifests and asset indices.
//!
//! Structured values are canonicalized first: object keys are sorted at every
//! depth and the encoding is compact, so two logically equal documents whose
//! fields arrive in a different order always produce the same fingerprint.
//! Array order is significant and kept as is.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Prefix for all fingerprints produced by this module
const PREFIX: &str = "sha256:";

/// Fingerprint any serializable value.
///
/// # Errors
///
/// Returns an error if the value cannot be represented as JSON
/// (e.g. a map with non-string keys).
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).map_err(|e| Error::Serialize {
        message: e.to_string(),
    })?;
    Ok(fingerprint_value(&value))
}

/// Fingerprint an already-parsed JSON value.
pub fn fingerprint_value(value: &Value) -> String {
    fingerprint_bytes(canonical_json(value).as_bytes())
}

/// Fingerprint raw bytes, e.g. a binary payload with no structure.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Render a JSON value in canonical form (sorted keys, no whitespace).
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
