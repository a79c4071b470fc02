//! Resource monitor implementation

use std::path::Path;
use std::time::{Duration, SystemTime};
use swifthaul_types::{
    CpuStats, DiskStats, Error, MemoryStats, NetworkStats, Result, RuntimeStats, SystemStats,
};
use sysinfo::{Disks, Networks, ProcessesToUpdate, System};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Options for the resource monitor
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// CPU utilization measurement window
    ///
    /// Clamped up to `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL` when shorter.
    pub cpu_sample_window: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            cpu_sample_window: Duration::from_secs(1),
        }
    }
}

/// System resource monitor
#[derive(Debug, Clone)]
pub struct ResourceMonitor {
    options: MonitorOptions,
}

impl ResourceMonitor {
    /// Create a new monitor
    pub fn new(options: MonitorOptions) -> Self {
        Self { options }
    }

    /// Gather a full snapshot of CPU, memory, disk, network, and runtime
    /// figures
    ///
    /// Blocks for the CPU sampling window; the sampling itself runs on the
    /// blocking pool.
    pub async fn snapshot(&self) -> Result<SystemStats> {
        let window = self.cpu_window();
        let handle = tokio::runtime::Handle::current();
        let stats = tokio::task::spawn_blocking(move || -> Result<SystemStats> {
            Ok(SystemStats {
                timestamp: SystemTime::now(),
                cpu: sample_cpu(window),
                memory: sample_memory(),
                disks: sample_disks(None)?,
                networks: sample_networks(),
                runtime: sample_runtime(&handle)?,
            })
        })
        .await
        .map_err(|e| Error::monitor(format!("sampling task failed: {}", e)))??;

        debug!(
            "Snapshot: cpu {:.1}%, {} disks, {} interfaces",
            stats.cpu.average,
            stats.disks.len(),
            stats.networks.len()
        );
        Ok(stats)
    }

    /// CPU utilization only, sampled over the configured window
    pub async fn cpu_stats(&self) -> Result<CpuStats> {
        let window = self.cpu_window();
        tokio::task::spawn_blocking(move || sample_cpu(window))
            .await
            .map_err(|e| Error::monitor(format!("sampling task failed: {}", e)))
    }

    /// Point-in-time memory figures
    pub async fn memory_stats(&self) -> Result<MemoryStats> {
        tokio::task::spawn_blocking(sample_memory)
            .await
            .map_err(|e| Error::monitor(format!("sampling task failed: {}", e)))
    }

    /// Mounted-filesystem figures
    ///
    /// With `None`, returns every mounted, statable filesystem; partitions
    /// that cannot be statted are skipped, never an error. With `Some(path)`,
    /// returns only the mount covering the path (longest mount-point prefix
    /// match).
    pub async fn disk_stats(&self, path: Option<&Path>) -> Result<Vec<DiskStats>> {
        let path = path.map(Path::to_path_buf);
        tokio::task::spawn_blocking(move || sample_disks(path.as_deref()))
            .await
            .map_err(|e| Error::monitor(format!("sampling task failed: {}", e)))?
    }

    /// Per-interface cumulative counters since boot
    ///
    /// Callers compute rates by diffing two snapshots.
    pub async fn network_stats(&self) -> Result<Vec<NetworkStats>> {
        tokio::task::spawn_blocking(sample_networks)
            .await
            .map_err(|e| Error::monitor(format!("sampling task failed: {}", e)))
    }

    /// Runtime internals of the engine process itself
    pub async fn runtime_stats(&self) -> Result<RuntimeStats> {
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || sample_runtime(&handle))
            .await
            .map_err(|e| Error::monitor(format!("sampling task failed: {}", e)))?
    }

    /// Invoke `callback` with a fresh snapshot on a fixed ticker until the
    /// token is cancelled
    ///
    /// The first sample is taken immediately. Returns the number of samples
    /// delivered.
    pub async fn watch<F>(
        &self,
        interval: Duration,
        token: CancellationToken,
        mut callback: F,
    ) -> Result<u64>
    where
        F: FnMut(SystemStats) + Send,
    {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(10)));
        let mut samples = 0u64;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let stats = self.snapshot().await?;
                    callback(stats);
                    samples += 1;
                }
            }
        }
        debug!("Watch loop stopped after {} samples", samples);
        Ok(samples)
    }

    fn cpu_window(&self) -> Duration {
        self.options
            .cpu_sample_window
            .max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new(MonitorOptions::default())
    }
}

fn sample_cpu(window: Duration) -> CpuStats {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    std::thread::sleep(window);
    sys.refresh_cpu_usage();

    let per_core: Vec<f32> = sys.cpus().iter().map(|c| c.cpu_usage()).collect();
    let average = if per_core.is_empty() {
        0.0
    } else {
        per_core.iter().sum::<f32>() / per_core.len() as f32
    };
    CpuStats { per_core, average }
}

fn sample_memory() -> MemoryStats {
    let mut sys = System::new();
    sys.refresh_memory();
    MemoryStats {
        total: sys.total_memory(),
        used: sys.used_memory(),
        available: sys.available_memory(),
        swap_total: sys.total_swap(),
        swap_used: sys.used_swap(),
    }
}

fn sample_disks(path: Option<&Path>) -> Result<Vec<DiskStats>> {
    let disks = Disks::new_with_refreshed_list();
    let mut stats: Vec<DiskStats> = disks
        .iter()
        .filter(|d| d.total_space() > 0)
        .map(|d| {
            let total = d.total_space();
            let available = d.available_space();
            DiskStats {
                name: d.name().to_string_lossy().to_string(),
                mount_point: d.mount_point().to_path_buf(),
                total,
                used: total.saturating_sub(available),
                available,
            }
        })
        .collect();

    let Some(path) = path else {
        return Ok(stats);
    };

    // longest mount-point prefix wins, so /home beats / for /home/x
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    stats.sort_by_key(|d| std::cmp::Reverse(d.mount_point.components().count()));
    let covering = stats
        .into_iter()
        .find(|d| path.starts_with(&d.mount_point))
        .ok_or_else(|| {
            Error::monitor(format!("no mounted filesystem covers {}", path.display()))
        })?;
    Ok(vec![covering])
}

fn sample_networks() -> Vec<NetworkStats> {
    let networks = Networks::new_with_refreshed_list();
    networks
        .iter()
        .map(|(name, data)| NetworkStats {
            interface: name.clone(),
            bytes_received: data.total_received(),
            bytes_sent: data.total_transmitted(),
            packets_received: data.total_packets_received(),
            packets_sent: data.total_packets_transmitted(),
        })
        .collect()
}

fn sample_runtime(handle: &tokio::runtime::Handle) -> Result<RuntimeStats> {
    let metrics = handle.metrics();
    let pid = sysinfo::get_current_pid()
        .map_err(|e| Error::monitor(format!("failed to determine own pid: {}", e)))?;

    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    let process = sys
        .process(pid)
        .ok_or_else(|| Error::monitor("own process missing from the process table"))?;

    Ok(RuntimeStats {
        worker_threads: metrics.num_workers(),
        alive_tasks: metrics.num_alive_tasks(),
        rss_bytes: process.memory(),
        virtual_memory_bytes: process.virtual_memory(),
    })
}
