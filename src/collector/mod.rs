//! Data sources of the agent.
//!
//! Collectors read kernel status files through the [`FileSystem`] trait so
//! the same code runs against the real `/proc` on Linux and against
//! [`MockFs`] in tests.
//!
//! # Usage
//!
//! ```
//! use mdstat_collector::collector::{MdadmCollector, MockFs};
//! use mdstat_collector::config::MdstatConfig;
//! use mdstat_collector::metrics::Sample;
//!
//! let fs = MockFs::healthy_mirror();
//! let mut samples: Vec<Sample> = Vec::new();
//! let devices = MdadmCollector::new()
//!     .update(&fs, &MdstatConfig::default(), &mut samples)
//!     .unwrap();
//! assert_eq!(devices, 1);
//! assert_eq!(samples.len(), 5);
//! ```

pub mod mdstat;
pub mod mock;
pub mod traits;

pub use mdstat::{CollectError, DeviceStatus, MdadmCollector, ParseError};
pub use mock::MockFs;
pub use traits::{FileSystem, RealFs};
