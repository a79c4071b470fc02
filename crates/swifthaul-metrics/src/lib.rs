//! Process-wide metrics aggregation for the swifthaul performance engine
//!
//! [`MetricsCollector`] accumulates per-operation running statistics and
//! tracks the progress of at most one active transfer. The engine
//! constructs a single collector and hands `Arc<MetricsCollector>` to call
//! sites; all state sits behind one read-write lock, and every getter
//! returns a deep copy.

#![deny(missing_docs)]

pub mod collector;

pub use collector::MetricsCollector;
