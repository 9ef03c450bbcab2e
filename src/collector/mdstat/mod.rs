//! Linux software-RAID (md) collector.
//!
//! Parses `/proc/mdstat` and exports per-device gauges: activity, active and
//! configured disks, total and synced blocks.

mod collector;
pub mod parser;

pub use collector::{
    BLOCKS_SYNCED, BLOCKS_TOTAL, CollectError, DEVICE_LABEL, DISKS_ACTIVE, DISKS_TOTAL, GaugeDef,
    IS_ACTIVE, MdadmCollector, emit_device_metrics, gauge_opts,
};
pub use parser::{DeviceStatus, LineKind, ParseError, parse_mdstat};
