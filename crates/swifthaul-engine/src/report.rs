//! Operation reports

use serde::{Deserialize, Serialize};
use std::time::Duration;
use swifthaul_types::{
    ChecksumBatch, CompressionResult, DirectoryCopyResult, DiskStats, DnsResult, FileCopyResult,
    MetricsSummary, OperationId, PingResult, PortScanResult, ProbeBatch, SystemStats,
    TransferResult,
};

/// Operation-specific payload of a report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportPayload {
    /// Checksum batch from a hash operation
    Checksums(ChecksumBatch),
    /// Outcome of a digest verification
    Verification {
        /// Whether the recomputed digest matched the expected value
        matches: bool,
    },
    /// Outcome of a single-file copy
    FileCopy(FileCopyResult),
    /// Outcome of a tree copy
    DirectoryCopy(DirectoryCopyResult),
    /// Outcome of a compression or decompression
    Compression(CompressionResult),
    /// Reachability probe batch
    Ping(ProbeBatch<PingResult>),
    /// Port scan batch
    PortScan(ProbeBatch<PortScanResult>),
    /// DNS lookup batch
    Dns(ProbeBatch<DnsResult>),
    /// Outcome of one download
    Transfer(TransferResult),
    /// Multi-file download batch
    Transfers(ProbeBatch<TransferResult>),
    /// System resource snapshot
    System(SystemStats),
    /// Mounted-filesystem figures
    Disks {
        /// One entry per reported mount
        disks: Vec<DiskStats>,
    },
    /// Aggregate metrics view
    Metrics(MetricsSummary),
    /// The operation produced no payload
    Empty,
}

/// Uniform result envelope for one executed operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    /// Unique id of this execution
    pub id: OperationId,
    /// Operation name, matching the request tag
    pub operation: String,
    /// Whether the operation succeeded
    ///
    /// Batch operations carry their own partial-success semantics in the
    /// payload; this flag follows them.
    pub success: bool,
    /// Wall-clock time the dispatch took
    pub duration: Duration,
    /// Error text when the operation failed outright
    pub error: Option<String>,
    /// Operation-specific result, absent on outright failure
    pub payload: Option<ReportPayload>,
}

impl OperationReport {
    /// Build a success report
    pub fn success(operation: &str, duration: Duration, payload: ReportPayload) -> Self {
        Self {
            id: OperationId::new_v4(),
            operation: operation.to_string(),
            success: true,
            duration,
            error: None,
            payload: Some(payload),
        }
    }

    /// Build a success report whose payload carries its own success flag
    pub fn partial(
        operation: &str,
        duration: Duration,
        success: bool,
        payload: ReportPayload,
    ) -> Self {
        Self {
            id: OperationId::new_v4(),
            operation: operation.to_string(),
            success,
            duration,
            error: None,
            payload: Some(payload),
        }
    }

    /// Build a failure report
    pub fn failure(operation: &str, duration: Duration, error: String) -> Self {
        Self {
            id: OperationId::new_v4(),
            operation: operation.to_string(),
            success: false,
            duration,
            error: Some(error),
            payload: None,
        }
    }
}
