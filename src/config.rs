//! Collector configuration.
//!
//! The location of the status report and the metric namespace are explicit
//! values handed to the collector on every pass.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the md status report.
pub const DEFAULT_MDSTAT_PATH: &str = "/proc/mdstat";

/// Default metric namespace, giving names like `node_md_disks`.
pub const DEFAULT_NAMESPACE: &str = "node";

/// Configuration of the md collector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MdstatConfig {
    /// Path of the status report to read.
    pub path: PathBuf,
    /// Prefix of every exported metric name. May be empty.
    pub namespace: String,
}

impl Default for MdstatConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MDSTAT_PATH),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl MdstatConfig {
    /// Reads `mdstat` under a procfs mounted at `proc_path`.
    pub fn with_proc_root(mut self, proc_path: impl AsRef<Path>) -> Self {
        self.path = proc_path.as_ref().join("mdstat");
        self
    }

    /// Reads the status report from `path`.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MdstatConfig::default();
        assert_eq!(config.path, PathBuf::from("/proc/mdstat"));
        assert_eq!(config.namespace, "node");
    }

    #[test]
    fn test_builders() {
        let config = MdstatConfig::default()
            .with_proc_root("/host/proc")
            .with_namespace("host");
        assert_eq!(config.path, PathBuf::from("/host/proc/mdstat"));
        assert_eq!(config.namespace, "host");

        let config = config.with_path("/tmp/mdstat.snapshot");
        assert_eq!(config.path, PathBuf::from("/tmp/mdstat.snapshot"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: MdstatConfig = serde_json::from_str(r#"{"namespace": ""}"#).unwrap();
        assert_eq!(config.path, PathBuf::from("/proc/mdstat"));
        assert_eq!(config.namespace, "");
    }
}
