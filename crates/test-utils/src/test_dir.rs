//! Temporary directory management for tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A managed temporary directory, cleaned up on drop.
///
/// # Example
///
/// ```
/// use nebula_repository_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let root = dir.join("repository");
/// // Point a LocalDriver at `root`...
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Creates a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: TempDir::new().expect("failed to create temp directory") }
    }

    /// The directory's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Joins a relative path onto the directory.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.inner.path().join(path)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_exists_and_is_writable() {
        let dir = TestDir::new();
        assert!(dir.path().is_dir());
        std::fs::write(dir.join("probe.txt"), "ok").expect("write probe");
        assert!(dir.join("probe.txt").exists());
    }

    #[test]
    fn test_dir_cleans_up_on_drop() {
        let path = {
            let dir = TestDir::new();
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
