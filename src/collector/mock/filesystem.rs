//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! `MockFs` holds file contents in memory and can be told to fail reads of
//! specific paths, so both the happy path and I/O failures can be exercised
//! on any platform.

use crate::collector::traits::FileSystem;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Paths whose reads fail with the given error kind.
    errors: HashMap<PathBuf, io::ErrorKind>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content, replacing any previous content.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.errors.remove(&path);
        self.files.insert(path, content.into());
    }

    /// Makes every read of `path` fail with `kind`.
    ///
    /// Takes precedence over file contents added for the same path.
    pub fn add_error(&mut self, path: impl AsRef<Path>, kind: io::ErrorKind) {
        self.errors.insert(path.as_ref().to_path_buf(), kind);
    }

    /// Loads a single file from the real filesystem under a virtual path.
    ///
    /// Useful for regression tests with captured `/proc/mdstat` snapshots.
    pub fn from_snapshot(real: &Path, virtual_path: impl AsRef<Path>) -> io::Result<Self> {
        let mut fs = Self::new();
        fs.add_file(virtual_path, std::fs::read_to_string(real)?);
        Ok(fs)
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if let Some(kind) = self.errors.get(path) {
            return Err(io::Error::new(
                *kind,
                format!("injected failure reading {:?}", path),
            ));
        }

        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }
}
