//! Result objects for swifthaul operations
//!
//! Every type here is a self-describing, point-in-time value: a success flag
//! plus error text is always enough for the orchestrator to render it without
//! guessing. Batches preserve 1:1 correspondence with their input list, in
//! input order.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Unique identifier for engine operations
pub type OperationId = uuid::Uuid;

const MB: f64 = 1024.0 * 1024.0;

/// Compute a throughput in MB/s, guarded against a zero duration
pub fn rate_mbps(bytes: u64, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 / MB / secs
    } else {
        0.0
    }
}

/// Per-file digest result for one hashed file
///
/// A missing or unreadable file still produces a result, with `error`
/// populated and empty digest strings; it never fails the batch.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChecksumResult {
    /// Path of the hashed file
    pub path: PathBuf,
    /// MD5 digest, 32 lowercase hex characters (empty on error)
    pub md5: String,
    /// SHA-1 digest, 40 lowercase hex characters (empty on error)
    pub sha1: String,
    /// SHA-256 digest, 64 lowercase hex characters (empty on error)
    pub sha256: String,
    /// File size in bytes (captured from stat even if the read later failed)
    pub size: u64,
    /// Error text if this file could not be hashed
    pub error: Option<String>,
}

impl ChecksumResult {
    /// Create a result for a file that could not be hashed
    pub fn failed<P: AsRef<Path>, S: Into<String>>(path: P, error: S) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            md5: String::new(),
            sha1: String::new(),
            sha256: String::new(),
            size: 0,
            error: Some(error.into()),
        }
    }

    /// Whether this file hashed cleanly
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered collection of checksum results, one per input file
///
/// `success` is unconditionally true: per-file failures are visible only in
/// the per-item `error` fields. This is a deliberate "never fail the whole
/// batch for one bad file" policy.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChecksumBatch {
    /// Per-file results, in input order
    pub results: Vec<ChecksumResult>,
    /// Always true; inspect per-item errors for failures
    pub success: bool,
    /// Wall-clock duration of the whole batch
    pub duration: Duration,
}

impl ChecksumBatch {
    /// Number of files that failed to hash
    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_ok()).count()
    }
}

/// Result of copying a single file
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileCopyResult {
    /// Source path
    pub source: PathBuf,
    /// Destination path
    pub destination: PathBuf,
    /// Bytes written to the destination
    pub bytes_copied: u64,
    /// Wall-clock duration of the copy
    pub duration: Duration,
    /// SHA-256 of the copied stream, computed as the bytes were written
    pub sha256: String,
    /// Throughput in MB/s (0 when the duration rounds to zero)
    pub rate_mbps: f64,
    /// Whether the copy completed
    pub success: bool,
}

/// Aggregate result of copying a directory tree
///
/// Bytes and counts are summed across the whole tree; per-file digests are
/// not retained.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DirectoryCopyResult {
    /// Source root
    pub source: PathBuf,
    /// Destination root
    pub destination: PathBuf,
    /// Number of regular files copied
    pub files_copied: u64,
    /// Number of directories created in the destination
    pub directories_created: u64,
    /// Total bytes copied across all files
    pub bytes_copied: u64,
    /// Wall-clock duration of the whole tree copy
    pub duration: Duration,
    /// Aggregate throughput in MB/s
    pub rate_mbps: f64,
    /// False if any file-level copy failed
    pub success: bool,
    /// First file-level error encountered, if any
    pub error: Option<String>,
}

/// Result of a compression or decompression operation
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompressionResult {
    /// Source path
    pub source: PathBuf,
    /// Destination path
    pub destination: PathBuf,
    /// Method name ("gzip", "zstd", "tar", "tar.gz", "tar.zst")
    pub method: String,
    /// Uncompressed byte total (for decompression: the decompressed total)
    pub original_size: u64,
    /// Compressed byte total (for decompression: the source file's on-disk size)
    pub compressed_size: u64,
    /// `compressed_size / original_size`; 1.0 when the original is empty.
    /// May exceed 1.0 on incompressible input.
    pub ratio: f64,
    /// Wall-clock duration
    pub duration: Duration,
    /// Number of regular files in the archive, for directory methods
    pub entries: Option<u64>,
    /// Whether the operation completed
    pub success: bool,
}

impl CompressionResult {
    /// Compute the reported ratio, guarded for an empty original
    pub fn compute_ratio(original: u64, compressed: u64) -> f64 {
        if original == 0 {
            return 1.0;
        }
        compressed as f64 / original as f64
    }
}

/// Result of an HTTP-based transfer
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferResult {
    /// Source URL
    pub url: String,
    /// Destination path
    pub destination: PathBuf,
    /// Bytes transferred
    pub bytes_transferred: u64,
    /// Wall-clock duration including retries
    pub duration: Duration,
    /// Throughput in MB/s
    pub rate_mbps: f64,
    /// Method identifier ("download", "chunked", "concurrent")
    pub method: String,
    /// Attempts used, including the successful one
    pub attempts: u32,
    /// Whether the transfer completed
    pub success: bool,
    /// Error text if the transfer failed
    pub error: Option<String>,
}

/// Result of one TCP reachability probe
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PingResult {
    /// Probed host
    pub host: String,
    /// Probed port (80 when the target carried none)
    pub port: u16,
    /// Whether the TCP handshake succeeded within the timeout
    pub connected: bool,
    /// Time to establish the connection
    pub latency: Duration,
    /// Error text when the dial failed
    pub error: Option<String>,
}

/// Result of probing one port on a host
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortScanResult {
    /// Scanned host
    pub host: String,
    /// Scanned port
    pub port: u16,
    /// Whether the TCP handshake succeeded within the timeout
    pub open: bool,
    /// Time taken by the dial attempt
    pub latency: Duration,
    /// Well-known service name for this port, if any; annotation only
    pub service: Option<String>,
}

/// A single MX record
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MxRecord {
    /// Preference value (lower is preferred)
    pub preference: u16,
    /// Mail exchanger host name
    pub exchange: String,
}

/// Result of resolving one domain
///
/// Only failure of the primary A/AAAA lookup fails the domain; CNAME, MX,
/// and TXT are best-effort.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DnsResult {
    /// Queried domain
    pub domain: String,
    /// Resolved A and AAAA addresses
    pub addresses: Vec<IpAddr>,
    /// Canonical name, reported only when it differs from the queried name
    pub cname: Option<String>,
    /// MX records
    pub mx: Vec<MxRecord>,
    /// TXT records
    pub txt: Vec<String>,
    /// Time taken by the primary lookup
    pub latency: Duration,
}

/// Ordered batch result of a bounded-concurrency probe run
///
/// `results` and `errors` are both 1:1 with the input targets, in input
/// order. `success` is true iff at least one target succeeded — a "was
/// anything reachable" signal, not "did everything succeed".
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProbeBatch<T> {
    /// Per-target results; `None` for targets that failed outright
    pub results: Vec<Option<T>>,
    /// Per-target error strings, parallel to `results`
    pub errors: Vec<Option<String>>,
    /// Wall-clock duration of the whole batch
    pub duration: Duration,
    /// Concurrency level the batch ran with
    pub concurrency: usize,
    /// True iff at least one target succeeded
    pub success: bool,
}

/// Per-core and average CPU utilization over the sampling window
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CpuStats {
    /// Per-core utilization percentages
    pub per_core: Vec<f32>,
    /// Average utilization across all cores
    pub average: f32,
}

/// Point-in-time memory figures, in bytes
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryStats {
    /// Total physical memory
    pub total: u64,
    /// Used physical memory
    pub used: u64,
    /// Memory available to new allocations
    pub available: u64,
    /// Total swap
    pub swap_total: u64,
    /// Used swap
    pub swap_used: u64,
}

/// Point-in-time figures for one mounted filesystem, in bytes
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiskStats {
    /// Device or volume name
    pub name: String,
    /// Mount point
    pub mount_point: PathBuf,
    /// Total capacity
    pub total: u64,
    /// Used capacity
    pub used: u64,
    /// Available capacity
    pub available: u64,
}

/// Cumulative counters for one network interface (since boot, not deltas)
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkStats {
    /// Interface name
    pub interface: String,
    /// Total bytes received
    pub bytes_received: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total packets received
    pub packets_received: u64,
    /// Total packets sent
    pub packets_sent: u64,
}

/// Runtime internals of the engine process itself
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuntimeStats {
    /// Tokio worker threads
    pub worker_threads: usize,
    /// Tasks currently alive on the runtime
    pub alive_tasks: usize,
    /// Resident set size of the process, in bytes
    pub rss_bytes: u64,
    /// Virtual memory of the process, in bytes
    pub virtual_memory_bytes: u64,
}

/// Timestamped snapshot of system resources
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemStats {
    /// When the snapshot was taken
    pub timestamp: SystemTime,
    /// CPU utilization sampled over the measurement window
    pub cpu: CpuStats,
    /// Memory figures
    pub memory: MemoryStats,
    /// One entry per statable mounted filesystem
    pub disks: Vec<DiskStats>,
    /// One entry per network interface, cumulative since boot
    pub networks: Vec<NetworkStats>,
    /// Engine process internals
    pub runtime: RuntimeStats,
}

/// Accumulated statistics for one named operation
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OperationStats {
    /// Operation name
    pub name: String,
    /// Number of executions recorded
    pub count: u64,
    /// Cumulative duration across all executions
    pub total_duration: Duration,
    /// Shortest recorded duration
    pub min_duration: Duration,
    /// Longest recorded duration
    pub max_duration: Duration,
    /// Number of failed executions
    pub error_count: u64,
    /// When the most recent execution was recorded
    pub last_execution: SystemTime,
}

impl OperationStats {
    /// Average duration per execution
    pub fn average_duration(&self) -> Duration {
        if self.count > 0 {
            self.total_duration / self.count as u32
        } else {
            Duration::ZERO
        }
    }
}

/// Progress of the currently tracked transfer
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferStats {
    /// Total bytes the transfer will move
    pub total_bytes: u64,
    /// Bytes moved so far
    pub transferred_bytes: u64,
    /// Current rate in bytes per second, derived from elapsed wall-clock time
    pub rate: f64,
    /// Files completed so far
    pub files_processed: u64,
    /// Total files in the transfer
    pub files_total: u64,
    /// Transfer-level error count
    pub error_count: u64,
    /// When the first update for this transfer was recorded
    pub started_at: SystemTime,
    /// Estimated time remaining; zero until a positive rate has been observed
    pub eta: Duration,
}

impl TransferStats {
    /// Progress percentage (0.0 - 100.0)
    pub fn progress_percent(&self) -> f64 {
        if self.total_bytes > 0 {
            (self.transferred_bytes as f64 / self.total_bytes as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Point-in-time summary across all recorded metrics
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsSummary {
    /// When accumulation started (construction or last reset)
    pub since: SystemTime,
    /// Distinct operation names recorded
    pub operation_names: u64,
    /// Total executions across all operations
    pub total_operations: u64,
    /// Total failed executions
    pub total_errors: u64,
    /// `total_errors / total_operations`, 0 when nothing has been recorded
    pub error_rate: f64,
    /// Active transfer progress, if a transfer has been updated
    pub transfer: Option<TransferStats>,
}
