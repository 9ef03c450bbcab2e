//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait lets the md collector read the real status report on
//! Linux or an in-memory one in tests and on other platforms.

use std::io;
use std::path::Path;

/// Abstraction for reading status files.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// A missing file must be reported as [`io::ErrorKind::NotFound`]; collectors
    /// rely on that kind to tell "nothing to report" apart from a read failure.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}
