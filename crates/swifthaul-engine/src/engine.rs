//! Engine dispatch loop

use crate::report::{OperationReport, ReportPayload};
use crate::request::OperationRequest;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use swifthaul_compression::{ArchiveFormat, CompressionOptions, Compressor};
use swifthaul_hash::{HashAlgorithm, HashOptions, Hasher};
use swifthaul_io::{Copier, CopyOptions};
use swifthaul_metrics::MetricsCollector;
use swifthaul_monitor::{MonitorOptions, ResourceMonitor};
use swifthaul_network::{ProbeOptions, Prober, TransferOptions, Transferer};
use swifthaul_types::Result;
use tracing::{info, warn};

/// Default options for every component, overridable per request
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Hashing defaults
    pub hash: HashOptions,
    /// Copy defaults
    pub copy: CopyOptions,
    /// Compression defaults
    pub compression: CompressionOptions,
    /// Probe defaults
    pub probe: ProbeOptions,
    /// HTTP transfer defaults
    pub transfer: TransferOptions,
    /// Resource monitor defaults
    pub monitor: MonitorOptions,
}

/// The performance engine
///
/// Owns one instance of each component plus a shared metrics collector.
/// Components are cheap to parameterize, so per-request knobs (concurrency,
/// timeouts, chunk size) override the engine defaults without shared state.
pub struct Engine {
    config: EngineConfig,
    monitor: ResourceMonitor,
    metrics: Arc<MetricsCollector>,
}

impl Engine {
    /// Create an engine with a fresh metrics collector
    pub fn new(config: EngineConfig) -> Self {
        Self::with_metrics(config, Arc::new(MetricsCollector::new()))
    }

    /// Create an engine sharing an existing metrics collector
    pub fn with_metrics(config: EngineConfig, metrics: Arc<MetricsCollector>) -> Self {
        let monitor = ResourceMonitor::new(config.monitor.clone());
        Self {
            config,
            monitor,
            metrics,
        }
    }

    /// The engine's metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics)
    }

    /// Execute one operation and report the outcome
    ///
    /// Never fails: operation errors come back in the report's
    /// `success`/`error` fields. Every dispatch is recorded on the metrics
    /// collector under the operation's name.
    pub async fn execute(&self, request: OperationRequest) -> OperationReport {
        let name = request.name();
        let start = Instant::now();

        let report = match self.dispatch(request).await {
            Ok((success, payload)) => {
                OperationReport::partial(name, start.elapsed(), success, payload)
            }
            Err(e) => OperationReport::failure(name, start.elapsed(), e.to_string()),
        };

        self.metrics
            .record_operation(name, report.duration, report.success)
            .await;
        if report.success {
            info!("{} completed in {:?}", name, report.duration);
        } else {
            warn!(
                "{} failed in {:?}: {}",
                name,
                report.duration,
                report.error.as_deref().unwrap_or("partial failure")
            );
        }
        report
    }

    /// JSON-in, JSON-out convenience over [`execute`](Self::execute)
    ///
    /// Only a malformed request or an unserializable report is an `Err`;
    /// operation failures serialize into the report like everywhere else.
    pub async fn execute_json(&self, json: &str) -> Result<String> {
        let request: OperationRequest = serde_json::from_str(json)
            .map_err(|e| swifthaul_types::Error::other(format!("invalid request: {}", e)))?;
        let report = self.execute(request).await;
        serde_json::to_string(&report)
            .map_err(|e| swifthaul_types::Error::other(format!("unserializable report: {}", e)))
    }

    async fn dispatch(&self, request: OperationRequest) -> Result<(bool, ReportPayload)> {
        match request {
            OperationRequest::HashFiles { paths, concurrency } => {
                let hasher = Hasher::new(self.hash_options(concurrency));
                let batch = hasher.hash_files(&paths).await?;
                Ok((batch.success, ReportPayload::Checksums(batch)))
            }
            OperationRequest::HashDirectory { root, concurrency } => {
                let hasher = Hasher::new(self.hash_options(concurrency));
                let batch = hasher.hash_directory(&root).await?;
                Ok((batch.success, ReportPayload::Checksums(batch)))
            }
            OperationRequest::VerifyChecksum {
                path,
                expected,
                algorithm,
            } => {
                let algorithm: HashAlgorithm = algorithm.parse()?;
                let hasher = Hasher::new(self.config.hash.clone());
                let matches = hasher.verify_checksum(&path, &expected, algorithm).await?;
                Ok((matches, ReportPayload::Verification { matches }))
            }
            OperationRequest::CopyFile {
                source,
                destination,
            } => {
                let copier = Copier::new(self.config.copy.clone());
                let result = copier.copy_file(&source, &destination).await?;
                Ok((result.success, ReportPayload::FileCopy(result)))
            }
            OperationRequest::CopyDirectory {
                source,
                destination,
                concurrency,
            } => {
                let mut options = self.config.copy.clone();
                if concurrency.is_some() {
                    options.concurrency = concurrency;
                }
                let copier = Copier::new(options);
                let result = copier.copy_directory(&source, &destination).await?;
                Ok((result.success, ReportPayload::DirectoryCopy(result)))
            }
            OperationRequest::Compress {
                source,
                destination,
                format,
            } => {
                let format = parse_format(format)?;
                let compressor = Compressor::new(self.config.compression.clone());
                let result = compressor.compress(&source, &destination, format).await?;
                Ok((result.success, ReportPayload::Compression(result)))
            }
            OperationRequest::Decompress {
                source,
                destination,
                format,
            } => {
                let format = parse_format(format)?;
                let compressor = Compressor::new(self.config.compression.clone());
                let result = compressor.decompress(&source, &destination, format).await?;
                Ok((result.success, ReportPayload::Compression(result)))
            }
            OperationRequest::Ping {
                hosts,
                timeout_secs,
                concurrency,
            } => {
                let prober = Prober::new(self.probe_options(timeout_secs, concurrency));
                let batch = prober.ping_hosts(&hosts).await;
                Ok((batch.success, ReportPayload::Ping(batch)))
            }
            OperationRequest::ScanPorts {
                host,
                ports,
                timeout_secs,
                concurrency,
            } => {
                let prober = Prober::new(self.probe_options(timeout_secs, concurrency));
                let batch = prober.scan_ports(&host, &ports).await;
                Ok((batch.success, ReportPayload::PortScan(batch)))
            }
            OperationRequest::LookupDomains {
                domains,
                concurrency,
            } => {
                let prober = Prober::new(self.probe_options(None, concurrency));
                let batch = prober.lookup_domains(&domains).await;
                Ok((batch.success, ReportPayload::Dns(batch)))
            }
            OperationRequest::Download { url, destination } => {
                let transferer = Transferer::new(self.config.transfer.clone())?;
                let result = transferer.download(&url, &destination).await;
                if !result.success {
                    self.metrics.record_transfer_error().await;
                }
                Ok((result.success, ReportPayload::Transfer(result)))
            }
            OperationRequest::DownloadChunked {
                url,
                destination,
                chunk_size,
            } => {
                let mut options = self.config.transfer.clone();
                if let Some(chunk_size) = chunk_size {
                    options.chunk_size = chunk_size;
                }
                let transferer = Transferer::new(options)?;
                let result = transferer.download_chunked(&url, &destination).await;
                if !result.success {
                    self.metrics.record_transfer_error().await;
                }
                Ok((result.success, ReportPayload::Transfer(result)))
            }
            OperationRequest::DownloadMany { downloads } => {
                let transferer = Transferer::new(self.config.transfer.clone())?;
                let items: Vec<(String, PathBuf)> = downloads
                    .into_iter()
                    .map(|d| (d.url, d.destination))
                    .collect();
                let batch = transferer.download_many(&items).await;
                let failures = batch.results.iter().flatten().filter(|r| !r.success).count();
                for _ in 0..failures {
                    self.metrics.record_transfer_error().await;
                }
                Ok((batch.success, ReportPayload::Transfers(batch)))
            }
            OperationRequest::SystemStats => {
                let stats = self.monitor.snapshot().await?;
                Ok((true, ReportPayload::System(stats)))
            }
            OperationRequest::DiskStats { path } => {
                let disks = self.monitor.disk_stats(path.as_deref()).await?;
                Ok((true, ReportPayload::Disks { disks }))
            }
            OperationRequest::MetricsSummary => {
                let summary = self.metrics.summary().await;
                Ok((true, ReportPayload::Metrics(summary)))
            }
            OperationRequest::MetricsReset => {
                self.metrics.reset().await;
                Ok((true, ReportPayload::Empty))
            }
        }
    }

    fn hash_options(&self, concurrency: Option<usize>) -> HashOptions {
        HashOptions {
            concurrency: concurrency.or(self.config.hash.concurrency),
        }
    }

    fn probe_options(
        &self,
        timeout_secs: Option<u64>,
        concurrency: Option<usize>,
    ) -> ProbeOptions {
        ProbeOptions {
            timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(self.config.probe.timeout),
            concurrency: concurrency.unwrap_or(self.config.probe.concurrency),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn parse_format(format: Option<String>) -> Result<Option<ArchiveFormat>> {
    format.map(|s| s.parse()).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_engine() -> Engine {
        Engine::new(EngineConfig {
            monitor: MonitorOptions {
                cpu_sample_window: Duration::from_millis(1),
            },
            ..EngineConfig::default()
        })
    }

    #[tokio::test]
    async fn test_hash_files_dispatch_records_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hello.txt");
        std::fs::write(&file, b"hello").unwrap();

        let engine = fast_engine();
        let report = engine
            .execute(OperationRequest::HashFiles {
                paths: vec![file],
                concurrency: None,
            })
            .await;

        assert!(report.success);
        assert_eq!(report.operation, "hash_files");
        match report.payload.unwrap() {
            ReportPayload::Checksums(batch) => {
                let result = &batch.results[0];
                assert_eq!(result.md5, "5d41402abc4b2a76b9719d911017c592");
            }
            other => panic!("wrong payload: {:?}", other),
        }

        let stats = engine.metrics().operation_stats("hash_files").await.unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.error_count, 0);
    }

    #[tokio::test]
    async fn test_verify_mismatch_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.txt");
        std::fs::write(&file, b"hello").unwrap();

        let engine = fast_engine();
        let report = engine
            .execute(OperationRequest::VerifyChecksum {
                path: file,
                expected: "0".repeat(32),
                algorithm: "md5".to_string(),
            })
            .await;

        assert!(!report.success);
        assert!(matches!(
            report.payload,
            Some(ReportPayload::Verification { matches: false })
        ));
        // mismatch is an unsuccessful dispatch, not an outright error
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_algorithm_is_outright_failure() {
        let engine = fast_engine();
        let report = engine
            .execute(OperationRequest::VerifyChecksum {
                path: "/nonexistent".into(),
                expected: String::new(),
                algorithm: "crc32".to_string(),
            })
            .await;
        assert!(!report.success);
        assert!(report.payload.is_none());
        assert!(report.error.unwrap().contains("crc32"));
    }

    #[tokio::test]
    async fn test_copy_then_verify_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        std::fs::write(&src, b"engine copy roundtrip").unwrap();
        let dst = dir.path().join("dst.bin");

        let engine = fast_engine();
        let report = engine
            .execute(OperationRequest::CopyFile {
                source: src,
                destination: dst.clone(),
            })
            .await;
        assert!(report.success);

        let sha256 = match report.payload.unwrap() {
            ReportPayload::FileCopy(result) => result.sha256,
            other => panic!("wrong payload: {:?}", other),
        };
        let verify = engine
            .execute(OperationRequest::VerifyChecksum {
                path: dst,
                expected: sha256,
                algorithm: "sha256".to_string(),
            })
            .await;
        assert!(verify.success);
    }

    #[tokio::test]
    async fn test_execute_json_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("payload.txt");
        std::fs::write(&file, b"json boundary").unwrap();

        let engine = fast_engine();
        let request = format!(
            r#"{{"operation": "hash_files", "paths": [{}]}}"#,
            serde_json::to_string(&file).unwrap()
        );
        let response = engine.execute_json(&request).await.unwrap();
        assert!(response.contains(r#""operation":"hash_files""#));
        assert!(response.contains(r#""success":true"#));

        let err = engine.execute_json("{not json}").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_metrics_summary_and_reset_dispatch() {
        let engine = fast_engine();
        engine
            .execute(OperationRequest::Ping {
                hosts: vec![],
                timeout_secs: Some(1),
                concurrency: Some(1),
            })
            .await;

        let report = engine.execute(OperationRequest::MetricsSummary).await;
        match report.payload.unwrap() {
            ReportPayload::Metrics(summary) => {
                assert!(summary.total_operations >= 1);
            }
            other => panic!("wrong payload: {:?}", other),
        }

        let reset = engine.execute(OperationRequest::MetricsReset).await;
        assert!(reset.success);
        // reset discards earlier names; only the reset itself is recorded after
        assert!(engine.metrics().operation_stats("ping").await.is_none());
    }
}
