//! System resource sampling for the swifthaul performance engine
//!
//! [`ResourceMonitor`] gathers timestamped snapshots of CPU, memory, disk,
//! network, and runtime figures. CPU utilization is sampled over a fixed
//! window (default one second), so a full snapshot deliberately trades
//! latency for accuracy. Individual accessors exist for cheap partial
//! sampling, and [`ResourceMonitor::watch`] runs a cancellable sampling
//! loop on a fixed ticker.

#![deny(missing_docs)]

pub mod monitor;

pub use monitor::{MonitorOptions, ResourceMonitor};
