//! Scratch directories for file-backed stores.
//!
//! A [`StoreDir`] hands out database paths by store name and can list or
//! damage the files a test left behind. Everything is removed on drop.

// Helpers panic instead of returning errors so tests stay short.
#![allow(clippy::expect_used)]

use std::path::PathBuf;

use tempfile::TempDir;

/// Extension of every store file.
const STORE_EXTENSION: &str = "redb";

/// Name used by [`StoreDir::db_path`].
const DEFAULT_STORE: &str = "coffer";

/// A temporary directory holding store files.
///
/// ```
/// use coffer_test_utils::StoreDir;
///
/// let dir = StoreDir::new();
/// assert!(dir.store_path("users").ends_with("users.redb"));
/// assert!(dir.store_files().is_empty());
/// ```
pub struct StoreDir {
    root: TempDir,
}

impl StoreDir {
    /// Creates an empty directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create store directory");
        Self { root }
    }

    /// Path of the store file named `name`. The file is not created.
    #[must_use]
    pub fn store_path(&self, name: &str) -> PathBuf {
        self.root.path().join(name).with_extension(STORE_EXTENSION)
    }

    /// Path of the default store file.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.store_path(DEFAULT_STORE)
    }

    /// Names of the store files currently in the directory, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be read.
    #[must_use]
    pub fn store_files(&self) -> Vec<String> {
        let entries = std::fs::read_dir(self.root.path()).expect("failed to read store directory");
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == STORE_EXTENSION))
            .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names
    }

    /// Writes bytes that are not a database under `name` and returns the path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_garbage(&self, name: &str) -> PathBuf {
        let path = self.store_path(name);
        std::fs::write(&path, [0xAB_u8; 4096]).expect("failed to write store file");
        path
    }
}

impl Default for StoreDir {
    fn default() -> Self {
        Self::new()
    }
}
