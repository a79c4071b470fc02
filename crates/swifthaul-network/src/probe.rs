//! Bounded-concurrency reachability, port, and DNS probing

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use swifthaul_types::{DnsResult, Error, MxRecord, PingResult, PortScanResult, ProbeBatch, Result};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::proto::rr::{RData, RecordType};
use trust_dns_resolver::TokioAsyncResolver;

/// Options shared by all probe kinds
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Per-dial (and per-lookup) timeout
    pub timeout: Duration,
    /// Maximum number of in-flight probes
    pub concurrency: usize,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            concurrency: 16,
        }
    }
}

/// Network prober
///
/// Every batch method dispatches one task per target, caps in-flight tasks
/// with a semaphore, and blocks until all targets complete. Per-target
/// failures are recorded in the batch, never fatal for the call.
#[derive(Debug, Clone)]
pub struct Prober {
    options: ProbeOptions,
}

impl Prober {
    /// Create a new prober
    pub fn new(options: ProbeOptions) -> Self {
        Self { options }
    }

    /// TCP-dial each host to check reachability
    ///
    /// A host may carry an explicit `host:port`; bare hosts default to
    /// port 80. Batch `success` is true iff at least one host connected.
    pub async fn ping_hosts(&self, hosts: &[String]) -> ProbeBatch<PingResult> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let timeout = self.options.timeout;

        let mut handles = Vec::with_capacity(hosts.len());
        for target in hosts {
            let target = target.clone();
            let permit_source = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = permit_source.acquire_owned().await;
                let (host, port) = split_host_port(&target, 80);
                let (connected, latency, error) = dial(&host, port, timeout).await;
                PingResult {
                    host,
                    port,
                    connected,
                    latency,
                    error,
                }
            }));
        }

        let mut results = Vec::with_capacity(hosts.len());
        let mut errors = Vec::with_capacity(hosts.len());
        for handle in handles {
            match handle.await {
                Ok(result) => {
                    errors.push(result.error.clone());
                    results.push(Some(result));
                }
                Err(e) => {
                    errors.push(Some(format!("probe task failed: {}", e)));
                    results.push(None);
                }
            }
        }

        let success = results
            .iter()
            .any(|r| r.as_ref().is_some_and(|p| p.connected));
        debug!("Pinged {} hosts in {:?}", hosts.len(), start.elapsed());
        ProbeBatch {
            results,
            errors,
            duration: start.elapsed(),
            concurrency: self.options.concurrency,
            success,
        }
    }

    /// Dial a list of ports on one host
    ///
    /// Open means the TCP handshake succeeded within the timeout. Known
    /// ports are annotated with a service name; the annotation never gates
    /// success. Batch `success` is true iff at least one port was open.
    pub async fn scan_ports(&self, host: &str, ports: &[u16]) -> ProbeBatch<PortScanResult> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let timeout = self.options.timeout;

        let mut handles = Vec::with_capacity(ports.len());
        for &port in ports {
            let host = host.to_string();
            let permit_source = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = permit_source.acquire_owned().await;
                let (open, latency, error) = dial(&host, port, timeout).await;
                let result = PortScanResult {
                    host,
                    port,
                    open,
                    latency,
                    service: service_name(port).map(str::to_string),
                };
                (result, error)
            }));
        }

        let mut results = Vec::with_capacity(ports.len());
        let mut errors = Vec::with_capacity(ports.len());
        for handle in handles {
            match handle.await {
                Ok((result, error)) => {
                    errors.push(error);
                    results.push(Some(result));
                }
                Err(e) => {
                    errors.push(Some(format!("probe task failed: {}", e)));
                    results.push(None);
                }
            }
        }

        let success = results.iter().any(|r| r.as_ref().is_some_and(|p| p.open));
        debug!(
            "Scanned {} ports on {} in {:?}",
            ports.len(),
            host,
            start.elapsed()
        );
        ProbeBatch {
            results,
            errors,
            duration: start.elapsed(),
            concurrency: self.options.concurrency,
            success,
        }
    }

    /// Resolve each domain's A/AAAA records plus best-effort CNAME, MX, TXT
    ///
    /// Only failure of the primary A/AAAA lookup fails a domain; the
    /// secondary lookups degrade to empty results independently.
    pub async fn lookup_domains(&self, domains: &[String]) -> ProbeBatch<DnsResult> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let resolver = system_resolver();

        let mut handles = Vec::with_capacity(domains.len());
        for domain in domains {
            let domain = domain.clone();
            let resolver = resolver.clone();
            let permit_source = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = permit_source.acquire_owned().await;
                resolve_domain(&resolver, &domain).await
            }));
        }

        let mut results = Vec::with_capacity(domains.len());
        let mut errors = Vec::with_capacity(domains.len());
        for handle in handles {
            match handle.await {
                Ok(Ok(result)) => {
                    errors.push(None);
                    results.push(Some(result));
                }
                Ok(Err(e)) => {
                    errors.push(Some(e.to_string()));
                    results.push(None);
                }
                Err(e) => {
                    errors.push(Some(format!("probe task failed: {}", e)));
                    results.push(None);
                }
            }
        }

        let success = results.iter().any(Option::is_some);
        debug!(
            "Resolved {} domains in {:?}",
            domains.len(),
            start.elapsed()
        );
        ProbeBatch {
            results,
            errors,
            duration: start.elapsed(),
            concurrency: self.options.concurrency,
            success,
        }
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new(ProbeOptions::default())
    }
}

/// System resolver configuration when available, library defaults otherwise
fn system_resolver() -> TokioAsyncResolver {
    TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
        TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
    })
}

async fn resolve_domain(resolver: &TokioAsyncResolver, domain: &str) -> Result<DnsResult> {
    let start = Instant::now();
    let lookup = resolver
        .lookup_ip(domain)
        .await
        .map_err(|e| Error::dns(format!("failed to resolve {}: {}", domain, e)))?;
    let latency = start.elapsed();
    let addresses: Vec<IpAddr> = lookup.iter().collect();

    let cname = match resolver.lookup(domain, RecordType::CNAME).await {
        Ok(records) => records.iter().find_map(|r| match r {
            RData::CNAME(name) => Some(name.0.to_utf8()),
            _ => None,
        }),
        Err(_) => None,
    }
    .filter(|canonical| !names_equal(canonical, domain));

    let mx = match resolver.mx_lookup(domain).await {
        Ok(records) => {
            let mut mx: Vec<MxRecord> = records
                .iter()
                .map(|r| MxRecord {
                    preference: r.preference(),
                    exchange: r.exchange().to_utf8(),
                })
                .collect();
            mx.sort_by_key(|r| r.preference);
            mx
        }
        Err(_) => Vec::new(),
    };

    let txt = match resolver.txt_lookup(domain).await {
        Ok(records) => records.iter().map(|t| t.to_string()).collect(),
        Err(_) => Vec::new(),
    };

    Ok(DnsResult {
        domain: domain.to_string(),
        addresses,
        cname,
        mx,
        txt,
        latency,
    })
}

/// DNS names compare case-insensitively, ignoring the trailing root dot
fn names_equal(a: &str, b: &str) -> bool {
    a.trim_end_matches('.').eq_ignore_ascii_case(b.trim_end_matches('.'))
}

async fn dial(host: &str, port: u16, timeout: Duration) -> (bool, Duration, Option<String>) {
    let start = Instant::now();
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => (true, start.elapsed(), None),
        Ok(Err(e)) => (false, start.elapsed(), Some(e.to_string())),
        Err(_) => (
            false,
            start.elapsed(),
            Some(format!("connection timed out after {:?}", timeout)),
        ),
    }
}

/// Split an optional `host:port` target, defaulting the port
///
/// Bare IPv6 addresses (more than one colon, no brackets) keep the default
/// port; a bracketed `[addr]:port` form is honored.
fn split_host_port(target: &str, default_port: u16) -> (String, u16) {
    if let Some(rest) = target.strip_prefix('[') {
        if let Some((host, port)) = rest.split_once("]:") {
            if let Ok(port) = port.parse() {
                return (host.to_string(), port);
            }
        }
        return (rest.trim_end_matches(']').to_string(), default_port);
    }
    if target.matches(':').count() == 1 {
        if let Some((host, port)) = target.rsplit_once(':') {
            if let Ok(port) = port.parse() {
                return (host.to_string(), port);
            }
        }
    }
    (target.to_string(), default_port)
}

/// Well-known-port service annotation
fn service_name(port: u16) -> Option<&'static str> {
    let name = match port {
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 => "smtp",
        53 => "dns",
        80 => "http",
        110 => "pop3",
        143 => "imap",
        443 => "https",
        465 => "smtps",
        587 => "submission",
        993 => "imaps",
        995 => "pop3s",
        1433 => "mssql",
        3306 => "mysql",
        3389 => "rdp",
        5432 => "postgresql",
        5672 => "amqp",
        6379 => "redis",
        8080 => "http-alt",
        8443 => "https-alt",
        9200 => "elasticsearch",
        27017 => "mongodb",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("example.com", 80), ("example.com".into(), 80));
        assert_eq!(
            split_host_port("example.com:8443", 80),
            ("example.com".into(), 8443)
        );
        assert_eq!(split_host_port("::1", 80), ("::1".into(), 80));
        assert_eq!(split_host_port("[::1]:9000", 80), ("::1".into(), 9000));
    }

    #[test]
    fn test_service_table() {
        assert_eq!(service_name(22), Some("ssh"));
        assert_eq!(service_name(5432), Some("postgresql"));
        assert_eq!(service_name(6379), Some("redis"));
        assert_eq!(service_name(49152), None);
    }

    #[test]
    fn test_names_equal_ignores_root_dot_and_case() {
        assert!(names_equal("Example.COM.", "example.com"));
        assert!(!names_equal("cdn.example.com.", "example.com"));
    }

    #[tokio::test]
    async fn test_ping_open_and_closed_in_input_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_addr = listener.local_addr().unwrap().to_string();
        // Port 1 on loopback is reliably closed on test machines
        let hosts = vec!["127.0.0.1:1".to_string(), open_addr];

        let prober = Prober::new(ProbeOptions {
            timeout: Duration::from_secs(2),
            concurrency: 4,
        });
        let batch = prober.ping_hosts(&hosts).await;

        assert_eq!(batch.results.len(), 2);
        let closed = batch.results[0].as_ref().unwrap();
        assert!(!closed.connected);
        assert!(closed.error.is_some());
        let open = batch.results[1].as_ref().unwrap();
        assert!(open.connected);
        assert!(open.error.is_none());
        assert!(batch.success);
    }

    #[tokio::test]
    async fn test_ping_all_unreachable_fails_batch() {
        let prober = Prober::new(ProbeOptions {
            timeout: Duration::from_millis(500),
            concurrency: 2,
        });
        let batch = prober.ping_hosts(&["127.0.0.1:1".to_string()]).await;
        assert!(!batch.success);
        assert!(!batch.results[0].as_ref().unwrap().connected);
    }

    #[tokio::test]
    async fn test_scan_ports_mixed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_port = listener.local_addr().unwrap().port();

        let prober = Prober::new(ProbeOptions {
            timeout: Duration::from_secs(2),
            concurrency: 8,
        });
        let batch = prober.scan_ports("127.0.0.1", &[1, open_port]).await;

        assert_eq!(batch.results.len(), 2);
        assert!(!batch.results[0].as_ref().unwrap().open);
        assert!(batch.results[1].as_ref().unwrap().open);
        assert!(batch.success);
        // annotation only, never gates success
        assert_eq!(batch.results[0].as_ref().unwrap().service, None);
    }

    #[tokio::test]
    async fn test_empty_batch_has_no_success() {
        let prober = Prober::default();
        let batch = prober.ping_hosts(&[]).await;
        assert!(batch.results.is_empty());
        assert!(!batch.success);
    }
}
