//! Collection pass for md devices: read the status report, parse it and
//! export five gauges per device.

use std::io;
use std::path::PathBuf;

use prometheus::Opts;
use tracing::debug;

use super::parser::{DeviceStatus, ParseError, parse_mdstat};
use crate::collector::traits::FileSystem;
use crate::config::MdstatConfig;
use crate::metrics::{MetricSink, Sample};

const SUBSYSTEM: &str = "md";

/// Label carrying the device name on every md metric.
pub const DEVICE_LABEL: &str = "device";

/// Name and help text of an md gauge, before namespacing.
pub type GaugeDef = (&'static str, &'static str);

pub const IS_ACTIVE: GaugeDef = (
    "is_active",
    "Indicator whether the md-device is active or not.",
);
pub const DISKS_ACTIVE: GaugeDef = ("disks_active", "Number of active disks of device.");
pub const DISKS_TOTAL: GaugeDef = ("disks", "Total number of disks of device.");
pub const BLOCKS_TOTAL: GaugeDef = ("blocks", "Total number of blocks on device.");
pub const BLOCKS_SYNCED: GaugeDef = ("blocks_synced", "Number of blocks synced on device.");

/// Builds the options of an md gauge under `namespace`.
pub fn gauge_opts((name, help): GaugeDef, namespace: &str) -> Opts {
    Opts::new(name, help).namespace(namespace).subsystem(SUBSYSTEM)
}

/// Error type for a failed collection pass.
#[derive(Debug)]
pub enum CollectError {
    /// The status report exists but could not be read.
    Io(io::Error),
    /// The status report could not be parsed.
    Parse { path: PathBuf, source: ParseError },
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse { path, source } => {
                write!(f, "error parsing {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            CollectError::Parse { source, .. } => Some(source),
        }
    }
}

impl From<io::Error> for CollectError {
    fn from(e: io::Error) -> Self {
        CollectError::Io(e)
    }
}

/// Exports md device status. Holds no state; every pass starts fresh.
#[derive(Debug, Default, Clone, Copy)]
pub struct MdadmCollector;

impl MdadmCollector {
    /// Name under which the collector is registered.
    pub const NAME: &'static str = "mdadm";

    pub fn new() -> Self {
        Self
    }

    /// Reads and parses the status report at `config.path`.
    ///
    /// A missing report means the md driver is not loaded: that yields no
    /// devices rather than an error.
    pub fn parse<F: FileSystem>(
        &self,
        fs: &F,
        config: &MdstatConfig,
    ) -> Result<Vec<DeviceStatus>, CollectError> {
        let content = match fs.read_to_string(&config.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} not present, no md devices to report", config.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        parse_mdstat(&content, &config.path).map_err(|source| CollectError::Parse {
            path: config.path.clone(),
            source,
        })
    }

    /// Runs one collection pass and returns the number of devices reported.
    ///
    /// Nothing is emitted unless the whole report parses.
    pub fn update<F, S>(
        &self,
        fs: &F,
        config: &MdstatConfig,
        sink: &mut S,
    ) -> Result<usize, CollectError>
    where
        F: FileSystem,
        S: MetricSink + ?Sized,
    {
        let statuses = self.parse(fs, config)?;
        emit_device_metrics(&statuses, &config.namespace, sink);
        Ok(statuses.len())
    }
}

/// Emits the five md gauges for every device, grouped per device.
pub fn emit_device_metrics<S: MetricSink + ?Sized>(
    statuses: &[DeviceStatus],
    namespace: &str,
    sink: &mut S,
) {
    for status in statuses {
        debug!("collecting metrics for device {}", status.name);

        let is_active = if status.active { 1.0 } else { 0.0 };
        let gauges = [
            (IS_ACTIVE, is_active),
            (DISKS_ACTIVE, status.disks_active as f64),
            (DISKS_TOTAL, status.disks_total as f64),
            (BLOCKS_TOTAL, status.blocks_total as f64),
            (BLOCKS_SYNCED, status.blocks_synced as f64),
        ];

        for (def, value) in gauges {
            sink.emit(Sample::gauge(
                &gauge_opts(def, namespace),
                value,
                vec![(DEVICE_LABEL.to_string(), status.name.clone())],
            ));
        }
    }
}
