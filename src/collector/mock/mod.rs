//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built mdstat scenarios for testing
//! the md collector without requiring a Linux `/proc/mdstat`.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
pub use scenarios::MDSTAT_PATH;
