//! Item key to filesystem path mapping
//!
//! Item keys are forward-slash separated relative paths (`blog/hello`,
//! `inter/regular.woff2`). They are converted to platform-native paths only at
//! the I/O boundary, and any key that could escape its domain root is rejected.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Check that a key is a safe relative path.
///
/// Rejects empty keys, absolute keys, backslashes, NUL bytes, empty segments,
/// and `.`/`..` segments.
pub fn validate_item_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_key(key, "key is empty"));
    }
    if key.starts_with('/') {
        return Err(Error::invalid_key(key, "key must be relative"));
    }
    if key.contains('\\') || key.contains('\0') {
        return Err(Error::invalid_key(key, "key contains a forbidden character"));
    }
    for segment in key.split('/') {
        match segment {
            "" => return Err(Error::invalid_key(key, "key contains an empty segment")),
            "." | ".." => {
                return Err(Error::invalid_key(key, "key contains a relative segment"));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Native path for `key` under `root`. The key must already be validated.
pub fn key_path(root: &Path, key: &str) -> PathBuf {
    key.split('/')
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Forward-slash key for a file below `root`.
///
/// Returns `None` when `path` is not below `root` or a component is not
/// valid UTF-8.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str()?),
            _ => return None,
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("index")]
    #[case("blog/hello")]
    #[case("inter/Inter-Regular.woff2")]
    #[case(".hidden/file")]
    fn accepts_relative_keys(#[case] key: &str) {
        assert!(validate_item_key(key).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("/etc/passwd")]
    #[case("../escape")]
    #[case("a/../../b")]
    #[case("a//b")]
    #[case("a/./b")]
    #[case("trailing/")]
    #[case("back\\slash")]
    fn rejects_unsafe_keys(#[case] key: &str) {
        assert!(validate_item_key(key).is_err(), "{key:?} should be rejected");
    }

    #[test]
    fn key_path_joins_segments() {
        let root = Path::new("mirror");
        assert_eq!(
            key_path(root, "blog/hello.json"),
            Path::new("mirror").join("blog").join("hello.json")
        );
    }

    #[test]
    fn relative_key_inverts_key_path() {
        let root = Path::new("/data/media");
        let path = key_path(root, "img/hero.jpg");
        assert_eq!(relative_key(root, &path).as_deref(), Some("img/hero.jpg"));
    }

    #[test]
    fn relative_key_outside_root_is_none() {
        assert_eq!(relative_key(Path::new("/a"), Path::new("/b/c")), None);
        assert_eq!(relative_key(Path::new("/a"), Path::new("/a")), None);
    }
}
