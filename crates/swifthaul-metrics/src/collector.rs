//! Metrics collector implementation

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};
use swifthaul_types::{MetricsSummary, OperationStats, TransferStats};
use tokio::sync::RwLock;
use tracing::trace;

struct TransferState {
    stats: TransferStats,
    /// Monotonic anchor of the first update, for rate computation
    started: Instant,
}

struct MetricsState {
    since: SystemTime,
    operations: HashMap<String, OperationStats>,
    transfer: Option<TransferState>,
}

impl MetricsState {
    fn new() -> Self {
        Self {
            since: SystemTime::now(),
            operations: HashMap::new(),
            transfer: None,
        }
    }
}

/// Thread-safe aggregator of operation and transfer metrics
pub struct MetricsCollector {
    state: RwLock<MetricsState>,
}

impl MetricsCollector {
    /// Create an empty collector; the summary's `since` starts now
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MetricsState::new()),
        }
    }

    /// Record one execution of a named operation
    ///
    /// The first record for a name initializes min = max = `duration`.
    pub async fn record_operation(&self, name: &str, duration: Duration, success: bool) {
        let mut state = self.state.write().await;
        let now = SystemTime::now();
        let entry = state
            .operations
            .entry(name.to_string())
            .or_insert_with(|| OperationStats {
                name: name.to_string(),
                count: 0,
                total_duration: Duration::ZERO,
                min_duration: duration,
                max_duration: duration,
                error_count: 0,
                last_execution: now,
            });
        entry.count += 1;
        entry.total_duration += duration;
        entry.min_duration = entry.min_duration.min(duration);
        entry.max_duration = entry.max_duration.max(duration);
        if !success {
            entry.error_count += 1;
        }
        entry.last_execution = now;
        trace!("Recorded {} ({:?}, success={})", name, duration, success);
    }

    /// Update the active transfer's progress
    ///
    /// Rate and ETA derive from wall-clock time elapsed since the
    /// transfer's first update; ETA stays zero until a positive rate has
    /// been observed.
    pub async fn update_transfer(
        &self,
        total_bytes: u64,
        transferred_bytes: u64,
        files_processed: u64,
        files_total: u64,
    ) {
        let mut state = self.state.write().await;
        let transfer = state.transfer.get_or_insert_with(|| TransferState {
            stats: TransferStats {
                total_bytes,
                transferred_bytes: 0,
                rate: 0.0,
                files_processed: 0,
                files_total,
                error_count: 0,
                started_at: SystemTime::now(),
                eta: Duration::ZERO,
            },
            started: Instant::now(),
        });

        let stats = &mut transfer.stats;
        stats.total_bytes = total_bytes;
        stats.transferred_bytes = transferred_bytes;
        stats.files_processed = files_processed;
        stats.files_total = files_total;

        let elapsed = transfer.started.elapsed().as_secs_f64();
        stats.rate = if elapsed > 0.0 {
            transferred_bytes as f64 / elapsed
        } else {
            0.0
        };
        stats.eta = if stats.rate > 0.0 {
            let remaining = total_bytes.saturating_sub(transferred_bytes) as f64;
            Duration::from_secs_f64(remaining / stats.rate)
        } else {
            Duration::ZERO
        };
    }

    /// Increment the transfer-level error counter
    pub async fn record_transfer_error(&self) {
        let mut state = self.state.write().await;
        let transfer = state.transfer.get_or_insert_with(|| TransferState {
            stats: TransferStats {
                total_bytes: 0,
                transferred_bytes: 0,
                rate: 0.0,
                files_processed: 0,
                files_total: 0,
                error_count: 0,
                started_at: SystemTime::now(),
                eta: Duration::ZERO,
            },
            started: Instant::now(),
        });
        transfer.stats.error_count += 1;
    }

    /// Statistics for one operation name, if it has been recorded
    pub async fn operation_stats(&self, name: &str) -> Option<OperationStats> {
        self.state.read().await.operations.get(name).cloned()
    }

    /// A copy of every recorded operation's statistics
    pub async fn all_operation_stats(&self) -> HashMap<String, OperationStats> {
        self.state.read().await.operations.clone()
    }

    /// Progress of the active transfer, if one has been updated
    pub async fn transfer_stats(&self) -> Option<TransferStats> {
        self.state.read().await.transfer.as_ref().map(|t| t.stats.clone())
    }

    /// Discard all accumulated state and restart the `since` timestamp
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = MetricsState::new();
    }

    /// Aggregate view across all recorded metrics
    pub async fn summary(&self) -> MetricsSummary {
        let state = self.state.read().await;
        let total_operations: u64 = state.operations.values().map(|o| o.count).sum();
        let total_errors: u64 = state.operations.values().map(|o| o.error_count).sum();
        MetricsSummary {
            since: state.since,
            operation_names: state.operations.len() as u64,
            total_operations,
            total_errors,
            error_rate: if total_operations > 0 {
                total_errors as f64 / total_operations as f64
            } else {
                0.0
            },
            transfer: state.transfer.as_ref().map(|t| t.stats.clone()),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_record_initializes_min_max() {
        let collector = MetricsCollector::new();
        collector
            .record_operation("hash", Duration::from_millis(100), true)
            .await;

        let stats = collector.operation_stats("hash").await.unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.min_duration, Duration::from_millis(100));
        assert_eq!(stats.max_duration, Duration::from_millis(100));
        assert_eq!(stats.error_count, 0);
    }

    #[tokio::test]
    async fn test_running_statistics_accumulate() {
        let collector = MetricsCollector::new();
        collector
            .record_operation("copy", Duration::from_millis(100), true)
            .await;
        collector
            .record_operation("copy", Duration::from_millis(300), false)
            .await;

        let stats = collector.operation_stats("copy").await.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min_duration, Duration::from_millis(100));
        assert_eq!(stats.max_duration, Duration::from_millis(300));
        assert_eq!(stats.average_duration(), Duration::from_millis(200));
        assert_eq!(stats.error_count, 1);
    }

    #[tokio::test]
    async fn test_eta_zero_until_positive_rate() {
        let collector = MetricsCollector::new();
        collector.update_transfer(1000, 0, 0, 4).await;

        let stats = collector.transfer_stats().await.unwrap();
        assert_eq!(stats.rate, 0.0);
        assert_eq!(stats.eta, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_transfer_rate_from_elapsed_time() {
        let collector = MetricsCollector::new();
        collector.update_transfer(10_000, 0, 0, 4).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        collector.update_transfer(10_000, 5_000, 2, 4).await;

        let stats = collector.transfer_stats().await.unwrap();
        assert!(stats.rate > 0.0);
        assert!(stats.eta > Duration::ZERO);
        assert_eq!(stats.files_processed, 2);
        assert!((stats.progress_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_transfer_errors_counted_independently() {
        let collector = MetricsCollector::new();
        collector.record_transfer_error().await;
        collector.record_transfer_error().await;
        assert_eq!(collector.transfer_stats().await.unwrap().error_count, 2);
    }

    #[tokio::test]
    async fn test_summary_error_rate() {
        let collector = MetricsCollector::new();
        collector
            .record_operation("ping", Duration::from_millis(10), true)
            .await;
        collector
            .record_operation("ping", Duration::from_millis(10), false)
            .await;
        collector
            .record_operation("hash", Duration::from_millis(10), true)
            .await;

        let summary = collector.summary().await;
        assert_eq!(summary.operation_names, 2);
        assert_eq!(summary.total_operations, 3);
        assert_eq!(summary.total_errors, 1);
        assert!((summary.error_rate - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_reset_discards_state() {
        let collector = MetricsCollector::new();
        collector
            .record_operation("hash", Duration::from_millis(10), true)
            .await;
        collector.update_transfer(100, 50, 1, 2).await;
        let before = collector.summary().await.since;

        tokio::time::sleep(Duration::from_millis(20)).await;
        collector.reset().await;

        assert!(collector.operation_stats("hash").await.is_none());
        assert!(collector.transfer_stats().await.is_none());
        assert!(collector.summary().await.since > before);
    }
}
