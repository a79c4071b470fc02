//! swifthaul - migration performance engine CLI
//!
//! One subcommand per engine operation: hashing, verified copies,
//! compression, network probing, downloads, and resource monitoring.
//! `--json` prints the raw operation report for machine consumption.

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use swifthaul_engine::{DownloadItem, Engine, EngineConfig, OperationRequest, ReportPayload};
use swifthaul_monitor::{MonitorOptions, ResourceMonitor};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// swifthaul - performance engine for migration workloads
#[derive(Parser)]
#[command(
    name = "swifthaul",
    version = env!("CARGO_PKG_VERSION"),
    about = "Performance engine for migration workloads",
    long_about = "swifthaul bundles the heavy lifting of a migration run:\n\
                  multi-digest hashing, verified copies, compression and\n\
                  archiving, network probing, and resource monitoring."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Print the raw operation report as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash files (or a directory tree) with MD5, SHA-1, and SHA-256
    Hash {
        /// Files to hash, or a single directory to walk
        paths: Vec<PathBuf>,
        /// Maximum files hashed concurrently
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Verify a file against an expected digest
    Verify {
        /// File to verify
        path: PathBuf,
        /// Expected digest, hex
        expected: String,
        /// Digest algorithm
        #[arg(short, long, default_value = "sha256")]
        algorithm: String,
    },
    /// Copy a file or directory tree with an in-flight SHA-256
    Copy {
        /// Source path
        source: PathBuf,
        /// Destination path
        destination: PathBuf,
        /// Maximum files copied concurrently (tree copies)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Compress a file or archive a directory
    Compress {
        /// Source file or directory
        source: PathBuf,
        /// Destination path; format inferred from its suffix
        destination: PathBuf,
        /// Explicit format (gzip, zstd, tar, tar.gz, tar.zst)
        #[arg(short, long)]
        format: Option<String>,
    },
    /// Decompress a file or extract an archive
    Decompress {
        /// Source file
        source: PathBuf,
        /// Destination file or directory
        destination: PathBuf,
        /// Explicit format (gzip, zstd, tar, tar.gz, tar.zst)
        #[arg(short, long)]
        format: Option<String>,
    },
    /// TCP reachability probe for a list of hosts
    Ping {
        /// Targets, each host or host:port (port defaults to 80)
        hosts: Vec<String>,
        /// Per-dial timeout in seconds
        #[arg(short, long, default_value = "5")]
        timeout: u64,
        /// Maximum in-flight probes
        #[arg(short, long, default_value = "16")]
        concurrency: usize,
    },
    /// Dial a list of ports on one host
    Scan {
        /// Target host
        host: String,
        /// Ports to dial
        ports: Vec<u16>,
        /// Per-dial timeout in seconds
        #[arg(short, long, default_value = "5")]
        timeout: u64,
        /// Maximum in-flight probes
        #[arg(short, long, default_value = "16")]
        concurrency: usize,
    },
    /// Resolve domains (A/AAAA plus CNAME, MX, TXT)
    Dns {
        /// Domains to resolve
        domains: Vec<String>,
        /// Maximum in-flight lookups
        #[arg(short, long, default_value = "16")]
        concurrency: usize,
    },
    /// Download a URL to a file
    Fetch {
        /// Source URLs
        urls: Vec<String>,
        /// Destination file (single URL) or directory (several)
        #[arg(short, long)]
        output: PathBuf,
        /// Use sequential range requests
        #[arg(long)]
        chunked: bool,
        /// Range size in bytes for --chunked
        #[arg(long)]
        chunk_size: Option<u64>,
    },
    /// Show a system resource snapshot
    Stats {
        /// Report only the mount covering this path
        #[arg(long)]
        path: Option<PathBuf>,
        /// Keep sampling every N seconds until interrupted
        #[arg(short, long)]
        watch: Option<u64>,
    },
    /// Show or reset accumulated metrics
    Metrics {
        /// Discard accumulated metrics
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug, cli.quiet, cli.verbose)?;
    info!("swifthaul v{} starting", env!("CARGO_PKG_VERSION"));

    // watch mode runs its own sampling loop instead of a single dispatch
    if let Commands::Stats {
        path: None,
        watch: Some(interval),
    } = &cli.command
    {
        return watch_command(*interval, cli.quiet).await;
    }

    let engine = Engine::new(EngineConfig::default());
    let request = build_request(cli.command);
    let name = request.name();

    let spinner = if !cli.quiet && !cli.json {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(format!("Running {}...", name));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let report = engine.execute(request).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, cli.quiet);
    }

    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(debug: bool, quiet: bool, verbose: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap();

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

fn build_request(command: Commands) -> OperationRequest {
    match command {
        Commands::Hash { paths, concurrency } => {
            let concurrency = concurrency.or_else(|| Some(num_cpus::get()));
            if paths.len() == 1 && paths[0].is_dir() {
                OperationRequest::HashDirectory {
                    root: paths.into_iter().next().unwrap_or_default(),
                    concurrency,
                }
            } else {
                OperationRequest::HashFiles { paths, concurrency }
            }
        }
        Commands::Verify {
            path,
            expected,
            algorithm,
        } => OperationRequest::VerifyChecksum {
            path,
            expected,
            algorithm,
        },
        Commands::Copy {
            source,
            destination,
            concurrency,
        } => {
            if source.is_dir() {
                OperationRequest::CopyDirectory {
                    source,
                    destination,
                    concurrency: concurrency.or_else(|| Some(num_cpus::get())),
                }
            } else {
                OperationRequest::CopyFile {
                    source,
                    destination,
                }
            }
        }
        Commands::Compress {
            source,
            destination,
            format,
        } => OperationRequest::Compress {
            source,
            destination,
            format,
        },
        Commands::Decompress {
            source,
            destination,
            format,
        } => OperationRequest::Decompress {
            source,
            destination,
            format,
        },
        Commands::Ping {
            hosts,
            timeout,
            concurrency,
        } => OperationRequest::Ping {
            hosts,
            timeout_secs: Some(timeout),
            concurrency: Some(concurrency),
        },
        Commands::Scan {
            host,
            ports,
            timeout,
            concurrency,
        } => OperationRequest::ScanPorts {
            host,
            ports,
            timeout_secs: Some(timeout),
            concurrency: Some(concurrency),
        },
        Commands::Dns {
            domains,
            concurrency,
        } => OperationRequest::LookupDomains {
            domains,
            concurrency: Some(concurrency),
        },
        Commands::Fetch {
            urls,
            output,
            chunked,
            chunk_size,
        } => build_fetch_request(urls, output, chunked, chunk_size),
        Commands::Stats { path, watch: _ } => match path {
            Some(path) => OperationRequest::DiskStats { path: Some(path) },
            None => OperationRequest::SystemStats,
        },
        Commands::Metrics { reset } => {
            if reset {
                OperationRequest::MetricsReset
            } else {
                OperationRequest::MetricsSummary
            }
        }
    }
}

fn build_fetch_request(
    urls: Vec<String>,
    output: PathBuf,
    chunked: bool,
    chunk_size: Option<u64>,
) -> OperationRequest {
    if urls.len() > 1 {
        let downloads = urls
            .into_iter()
            .map(|url| {
                let file = url.rsplit('/').next().unwrap_or("download").to_string();
                DownloadItem {
                    url,
                    destination: output.join(file),
                }
            })
            .collect();
        OperationRequest::DownloadMany { downloads }
    } else {
        let url = urls.into_iter().next().unwrap_or_default();
        if chunked {
            OperationRequest::DownloadChunked {
                url,
                destination: output,
                chunk_size,
            }
        } else {
            OperationRequest::Download {
                url,
                destination: output,
            }
        }
    }
}

async fn watch_command(interval_secs: u64, quiet: bool) -> Result<()> {
    let monitor = ResourceMonitor::new(MonitorOptions::default());
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        canceller.cancel();
    });

    if !quiet {
        println!(
            "{} Sampling every {}s, Ctrl-C to stop",
            style("⟲").blue().bold(),
            interval_secs
        );
    }

    let samples = monitor
        .watch(
            Duration::from_secs(interval_secs.max(1)),
            token,
            |stats| {
                println!(
                    "cpu {:>5.1}%  mem {} / {}  tasks {}",
                    stats.cpu.average,
                    format_bytes(stats.memory.used),
                    format_bytes(stats.memory.total),
                    stats.runtime.alive_tasks
                );
            },
        )
        .await?;

    if !quiet {
        println!("{} Stopped after {} samples", style("✓").green(), samples);
    }
    Ok(())
}

fn print_report(report: &swifthaul_engine::OperationReport, quiet: bool) {
    if let Some(error) = &report.error {
        println!(
            "{} {} failed: {}",
            style("✗").red().bold(),
            report.operation,
            style(error).red()
        );
        return;
    }
    let Some(payload) = &report.payload else {
        return;
    };

    match payload {
        ReportPayload::Checksums(batch) => {
            for result in &batch.results {
                match &result.error {
                    Some(error) => println!(
                        "{} {}: {}",
                        style("✗").red(),
                        result.path.display(),
                        style(error).red()
                    ),
                    None => println!(
                        "{}  {} ({})",
                        result.sha256,
                        result.path.display(),
                        format_bytes(result.size)
                    ),
                }
            }
            if !quiet {
                println!(
                    "{} Hashed {} file(s) in {} ({} failed)",
                    style("✓").green(),
                    batch.results.len(),
                    format_duration(batch.duration),
                    batch.error_count()
                );
            }
        }
        ReportPayload::Verification { matches } => {
            if *matches {
                println!("{} Digest matches", style("✓").green().bold());
            } else {
                println!("{} Digest mismatch", style("✗").red().bold());
            }
        }
        ReportPayload::FileCopy(result) => {
            println!(
                "{} Copied {} ({}, {:.2} MB/s)",
                style("✓").green(),
                result.destination.display(),
                format_bytes(result.bytes_copied),
                result.rate_mbps
            );
            println!("  sha256: {}", style(&result.sha256).cyan());
        }
        ReportPayload::DirectoryCopy(result) => {
            println!(
                "{} Copied {} file(s), {} dir(s), {} in {}",
                if result.success {
                    style("✓").green()
                } else {
                    style("✗").red()
                },
                result.files_copied,
                result.directories_created,
                format_bytes(result.bytes_copied),
                format_duration(result.duration)
            );
            if let Some(error) = &result.error {
                println!("  first error: {}", style(error).red());
            }
        }
        ReportPayload::Compression(result) => {
            println!(
                "{} {} -> {} ({} -> {}, ratio {:.3})",
                style("✓").green(),
                result.source.display(),
                result.destination.display(),
                format_bytes(result.original_size),
                format_bytes(result.compressed_size),
                result.ratio
            );
            if let Some(entries) = result.entries {
                println!("  entries: {}", entries);
            }
        }
        ReportPayload::Ping(batch) => {
            for result in batch.results.iter().flatten() {
                if result.connected {
                    println!(
                        "{} {}:{} reachable in {}",
                        style("✓").green(),
                        result.host,
                        result.port,
                        format_duration(result.latency)
                    );
                } else {
                    println!(
                        "{} {}:{} unreachable ({})",
                        style("✗").red(),
                        result.host,
                        result.port,
                        result.error.as_deref().unwrap_or("no detail")
                    );
                }
            }
        }
        ReportPayload::PortScan(batch) => {
            for result in batch.results.iter().flatten() {
                let service = result.service.as_deref().unwrap_or("-");
                if result.open {
                    println!(
                        "{} {}/tcp open  {}",
                        style("✓").green(),
                        result.port,
                        service
                    );
                } else if !quiet {
                    println!("{} {}/tcp closed", style("·").dim(), result.port);
                }
            }
        }
        ReportPayload::Dns(batch) => {
            for (i, slot) in batch.results.iter().enumerate() {
                match slot {
                    Some(result) => {
                        println!("{} {}", style("✓").green(), style(&result.domain).cyan());
                        for addr in &result.addresses {
                            println!("  {}", addr);
                        }
                        if let Some(cname) = &result.cname {
                            println!("  cname: {}", cname);
                        }
                        for mx in &result.mx {
                            println!("  mx: {} {}", mx.preference, mx.exchange);
                        }
                        for txt in &result.txt {
                            println!("  txt: {}", txt);
                        }
                    }
                    None => println!(
                        "{} lookup failed: {}",
                        style("✗").red(),
                        batch.errors[i].as_deref().unwrap_or("no detail")
                    ),
                }
            }
        }
        ReportPayload::Transfer(result) => {
            if result.success {
                println!(
                    "{} Downloaded {} ({}, {:.2} MB/s, {} attempt(s))",
                    style("✓").green(),
                    result.destination.display(),
                    format_bytes(result.bytes_transferred),
                    result.rate_mbps,
                    result.attempts
                );
            } else {
                println!(
                    "{} Download of {} failed after {} attempt(s): {}",
                    style("✗").red(),
                    result.url,
                    result.attempts,
                    result.error.as_deref().unwrap_or("no detail")
                );
            }
        }
        ReportPayload::Transfers(batch) => {
            for result in batch.results.iter().flatten() {
                if result.success {
                    println!(
                        "{} {} ({})",
                        style("✓").green(),
                        result.destination.display(),
                        format_bytes(result.bytes_transferred)
                    );
                } else {
                    println!(
                        "{} {}: {}",
                        style("✗").red(),
                        result.url,
                        result.error.as_deref().unwrap_or("no detail")
                    );
                }
            }
        }
        ReportPayload::System(stats) => print_system_stats(stats),
        ReportPayload::Disks { disks } => {
            for disk in disks {
                println!(
                    "{}  {} used / {} ({} free)",
                    disk.mount_point.display(),
                    format_bytes(disk.used),
                    format_bytes(disk.total),
                    format_bytes(disk.available)
                );
            }
        }
        ReportPayload::Metrics(summary) => {
            println!("{}", style("Metrics:").bold().underlined());
            println!("  operations: {}", summary.total_operations);
            println!("  distinct names: {}", summary.operation_names);
            println!(
                "  errors: {} ({:.1}%)",
                summary.total_errors,
                summary.error_rate * 100.0
            );
            if let Some(transfer) = &summary.transfer {
                println!(
                    "  transfer: {:.1}% at {}/s, eta {}",
                    transfer.progress_percent(),
                    format_bytes(transfer.rate as u64),
                    format_duration(transfer.eta)
                );
            }
        }
        ReportPayload::Empty => {
            println!("{} Done", style("✓").green());
        }
    }
}

fn print_system_stats(stats: &swifthaul_types::SystemStats) {
    println!("{}", style("System:").bold().underlined());
    println!(
        "  cpu: {:.1}% avg over {} core(s)",
        stats.cpu.average,
        stats.cpu.per_core.len()
    );
    println!(
        "  memory: {} / {} used, {} available",
        format_bytes(stats.memory.used),
        format_bytes(stats.memory.total),
        format_bytes(stats.memory.available)
    );
    for disk in &stats.disks {
        println!(
            "  disk {}: {} / {}",
            disk.mount_point.display(),
            format_bytes(disk.used),
            format_bytes(disk.total)
        );
    }
    for net in &stats.networks {
        println!(
            "  net {}: rx {} tx {}",
            net.interface,
            format_bytes(net.bytes_received),
            format_bytes(net.bytes_sent)
        );
    }
    println!(
        "  runtime: {} worker(s), {} task(s), rss {}",
        stats.runtime.worker_threads,
        stats.runtime.alive_tasks,
        format_bytes(stats.runtime.rss_bytes)
    );
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
