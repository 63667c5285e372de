//! [`RequirementsTree`] builder for temporary requirement file layouts.

use std::fs;
use std::path::{Path, PathBuf};

use reqsync_core::RunConfig;
use tempfile::TempDir;

/// A temporary directory holding requirement files.
///
/// # Example
///
/// ```rust,no_run
/// use reqsync_test_utils::RequirementsTree;
///
/// let tree = RequirementsTree::new()
///     .with_file("requirements.txt", "-r base.txt\nflask>=2.0\n")
///     .with_file("base.txt", "requests\n");
/// tree.assert_content("base.txt", "requests\n");
/// ```
pub struct RequirementsTree {
    temp_dir: TempDir,
}

impl Default for RequirementsTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RequirementsTree {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of a file inside the tree.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a text file, creating parent directories.
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        self.with_bytes(relative, content.as_bytes())
    }

    /// Write raw bytes, for BOM and newline fixtures.
    pub fn with_bytes(self, relative: &str, content: &[u8]) -> Self {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        self
    }

    /// Read a file back as text.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("failed to read {relative}: {e}"))
    }

    /// Read a file back as bytes.
    pub fn read_bytes(&self, relative: &str) -> Vec<u8> {
        fs::read(self.path(relative)).unwrap_or_else(|e| panic!("failed to read {relative}: {e}"))
    }

    /// Snapshot of every regular file name and its bytes, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<(String, Vec<u8>)> = fs::read_dir(self.root())
            .unwrap()
            .filter_map(|entry| {
                let entry = entry.unwrap();
                entry.file_type().unwrap().is_file().then(|| {
                    (
                        entry.file_name().to_string_lossy().into_owned(),
                        fs::read(entry.path()).unwrap(),
                    )
                })
            })
            .collect();
        files.sort();
        files
    }

    /// Names of backups created for `relative`.
    pub fn backups_of(&self, relative: &str, suffix: &str) -> Vec<String> {
        let prefix = format!("{relative}{suffix}");
        let mut names: Vec<String> = self
            .snapshot()
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| name.starts_with(&prefix))
            .collect();
        names.sort();
        names
    }

    /// Apply-mode config for `relative` with the upgrade step disabled.
    pub fn config(&self, relative: &str) -> RunConfig {
        RunConfig {
            path: self.path(relative),
            no_upgrade: true,
            ..RunConfig::default()
        }
    }

    /// Assert a file's exact text.
    ///
    /// # Panics
    /// Panics if the content differs.
    pub fn assert_content(&self, relative: &str, expected: &str) {
        let actual = self.read(relative);
        assert_eq!(actual, expected, "unexpected content in {relative}");
    }
}
