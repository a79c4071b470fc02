//! Operation dispatch for the swifthaul performance engine
//!
//! This crate is the command boundary: an [`OperationRequest`] names one
//! operation and its arguments, [`Engine::execute`] dispatches it to the
//! owning component, and the outcome comes back as a uniform
//! [`OperationReport`]. Both sides serialize, so an orchestrating process
//! can drive the engine entirely through [`Engine::execute_json`].
//!
//! Every dispatch records its name, elapsed time, and success on the
//! engine's shared [`MetricsCollector`](swifthaul_metrics::MetricsCollector).

#![deny(missing_docs)]

pub mod engine;
pub mod report;
pub mod request;

pub use engine::{Engine, EngineConfig};
pub use report::{OperationReport, ReportPayload};
pub use request::{DownloadItem, OperationRequest};
