//! mdstat-collector - Linux software-RAID status collector.
//!
//! This library provides the pieces shared by the `mdstatd` daemon and any
//! agent embedding the collector:
//! - `collector` - `/proc/mdstat` parser and the md collector
//! - `metrics` - gauge samples, sinks and text exposition
//! - `config` - collector configuration

pub mod collector;
pub mod config;
pub mod metrics;
