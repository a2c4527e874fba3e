//! [`TestMirror`] temporary workspace for mirror test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory laid out as `<root>/mirror` and `<root>/state`.
///
/// # Example
///
/// ```rust,no_run
/// use mirror_test_utils::TestMirror;
///
/// let mirror = TestMirror::new();
/// mirror.write("mirror/content/blog/hello.json", r#"{"title":"Hello"}"#);
/// mirror.assert_file_exists("mirror/content/blog/hello.json");
/// ```
pub struct TestMirror {
    temp_dir: TempDir,
}

impl Default for TestMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl TestMirror {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Root of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory holding the local mirror.
    pub fn mirror_root(&self) -> PathBuf {
        self.root().join("mirror")
    }

    /// Directory holding manifests.
    pub fn state_dir(&self) -> PathBuf {
        self.root().join("state")
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Read `relative` as UTF-8.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative))
            .unwrap_or_else(|e| panic!("failed to read {relative}: {e}"))
    }

    /// Read and parse `relative` as JSON.
    pub fn read_json(&self, relative: &str) -> serde_json::Value {
        serde_json::from_str(&self.read(relative))
            .unwrap_or_else(|e| panic!("{relative} is not valid JSON: {e}"))
    }

    /// All files below `relative`, as sorted forward-slash paths relative to it.
    pub fn files_under(&self, relative: &str) -> Vec<String> {
        let base = self.root().join(relative);
        let mut found = Vec::new();
        collect_files(&base, &base, &mut found);
        found.sort();
        found
    }

    pub fn assert_file_exists(&self, relative: &str) {
        assert!(
            self.root().join(relative).is_file(),
            "expected file {relative} to exist"
        );
    }

    pub fn assert_file_missing(&self, relative: &str) {
        assert!(
            !self.root().join(relative).exists(),
            "expected {relative} to be absent"
        );
    }
}

fn collect_files(base: &Path, dir: &Path, found: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(base, &path, found);
        } else if let Ok(relative) = path.strip_prefix(base) {
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            found.push(segments.join("/"));
        }
    }
}
