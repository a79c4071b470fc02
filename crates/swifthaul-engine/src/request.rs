//! Operation requests

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One URL/destination pair for a multi-file download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadItem {
    /// Source URL
    pub url: String,
    /// Destination file path
    pub destination: PathBuf,
}

/// A single operation and its arguments
///
/// Serialized with an `operation` tag, so the JSON form reads
/// `{"operation": "hash_files", "paths": [...]}`. Optional knobs fall back
/// to engine defaults when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationRequest {
    /// Hash a list of files with all three digests
    HashFiles {
        /// Files to hash
        paths: Vec<PathBuf>,
        /// Maximum files hashed concurrently
        #[serde(default)]
        concurrency: Option<usize>,
    },
    /// Hash every regular file under a root
    HashDirectory {
        /// Root directory
        root: PathBuf,
        /// Maximum files hashed concurrently
        #[serde(default)]
        concurrency: Option<usize>,
    },
    /// Recompute one digest and compare against an expected value
    VerifyChecksum {
        /// File to verify
        path: PathBuf,
        /// Expected digest, hex
        expected: String,
        /// Digest algorithm name ("md5", "sha1", "sha256")
        algorithm: String,
    },
    /// Copy one file with an in-flight SHA-256
    CopyFile {
        /// Source file
        source: PathBuf,
        /// Destination file
        destination: PathBuf,
    },
    /// Copy a directory tree
    CopyDirectory {
        /// Source root
        source: PathBuf,
        /// Destination root
        destination: PathBuf,
        /// Maximum files copied concurrently
        #[serde(default)]
        concurrency: Option<usize>,
    },
    /// Compress a file or archive a directory
    Compress {
        /// Source file or directory
        source: PathBuf,
        /// Destination path
        destination: PathBuf,
        /// Explicit format name; inferred from the destination when omitted
        #[serde(default)]
        format: Option<String>,
    },
    /// Decompress a file or extract an archive
    Decompress {
        /// Source file
        source: PathBuf,
        /// Destination file or directory
        destination: PathBuf,
        /// Explicit format name; inferred from the source when omitted
        #[serde(default)]
        format: Option<String>,
    },
    /// TCP reachability probe for a list of hosts
    Ping {
        /// Targets, each `host` or `host:port`
        hosts: Vec<String>,
        /// Per-dial timeout in seconds
        #[serde(default)]
        timeout_secs: Option<u64>,
        /// Maximum in-flight probes
        #[serde(default)]
        concurrency: Option<usize>,
    },
    /// Dial a list of ports on one host
    ScanPorts {
        /// Target host
        host: String,
        /// Ports to dial
        ports: Vec<u16>,
        /// Per-dial timeout in seconds
        #[serde(default)]
        timeout_secs: Option<u64>,
        /// Maximum in-flight probes
        #[serde(default)]
        concurrency: Option<usize>,
    },
    /// Resolve a list of domains
    LookupDomains {
        /// Domains to resolve
        domains: Vec<String>,
        /// Maximum in-flight lookups
        #[serde(default)]
        concurrency: Option<usize>,
    },
    /// Download one URL to a file
    Download {
        /// Source URL
        url: String,
        /// Destination file
        destination: PathBuf,
    },
    /// Download one URL with sequential range requests
    DownloadChunked {
        /// Source URL
        url: String,
        /// Destination file
        destination: PathBuf,
        /// Range size in bytes
        #[serde(default)]
        chunk_size: Option<u64>,
    },
    /// Download several URLs concurrently
    DownloadMany {
        /// URL/destination pairs
        downloads: Vec<DownloadItem>,
    },
    /// Full system resource snapshot
    SystemStats,
    /// Mounted-filesystem figures, optionally for the mount covering a path
    DiskStats {
        /// Path whose covering mount is wanted; all mounts when omitted
        #[serde(default)]
        path: Option<PathBuf>,
    },
    /// Aggregate metrics summary
    MetricsSummary,
    /// Discard accumulated metrics
    MetricsReset,
}

impl OperationRequest {
    /// Operation name used for metrics recording and report labeling
    pub fn name(&self) -> &'static str {
        match self {
            Self::HashFiles { .. } => "hash_files",
            Self::HashDirectory { .. } => "hash_directory",
            Self::VerifyChecksum { .. } => "verify_checksum",
            Self::CopyFile { .. } => "copy_file",
            Self::CopyDirectory { .. } => "copy_directory",
            Self::Compress { .. } => "compress",
            Self::Decompress { .. } => "decompress",
            Self::Ping { .. } => "ping",
            Self::ScanPorts { .. } => "scan_ports",
            Self::LookupDomains { .. } => "lookup_domains",
            Self::Download { .. } => "download",
            Self::DownloadChunked { .. } => "download_chunked",
            Self::DownloadMany { .. } => "download_many",
            Self::SystemStats => "system_stats",
            Self::DiskStats { .. } => "disk_stats",
            Self::MetricsSummary => "metrics_summary",
            Self::MetricsReset => "metrics_reset",
        }
    }
}
