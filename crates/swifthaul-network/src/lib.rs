//! Network probing and transfer for the swifthaul performance engine
//!
//! This crate provides the engine's outward-facing network operations:
//!
//! - **Probing** ([`Prober`]): TCP reachability pings, port scans, and DNS
//!   lookups, all running one task per target under a counting semaphore
//!   with results in input order
//! - **HTTP transfer** ([`Transferer`]): streamed downloads with optional
//!   `Range` chunking, concurrent multi-file fan-out, and bounded retry
//! - **Building blocks**: a reusable [`ConnectionPool`] and a generic
//!   [`WorkerPool`] for callers with longer-lived connection needs

#![deny(missing_docs)]

pub mod pool;
pub mod probe;
pub mod transfer;
pub mod worker;

pub use pool::ConnectionPool;
pub use probe::{ProbeOptions, Prober};
pub use transfer::{RetryPolicy, TransferOptions, Transferer};
pub use worker::WorkerPool;
