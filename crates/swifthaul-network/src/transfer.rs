//! Streamed HTTP downloads with chunking, fan-out, and bounded retry

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use swifthaul_types::{rate_mbps, Error, ProbeBatch, Result, TransferResult};
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Fixed retry-with-delay policy, applied per file
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Options for the HTTP transfer path
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Range size for the chunked variant
    pub chunk_size: u64,
    /// Maximum number of concurrent downloads in the multi-file variant
    pub concurrency: usize,
    /// Per-file retry policy
    pub retry: RetryPolicy,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: 4 * 1024 * 1024,
            concurrency: 4,
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP downloader
///
/// Bodies are streamed to disk chunk by chunk, never buffered whole. This
/// path owns the engine's only retry: each file gets up to
/// `retry.attempts` tries with a fixed delay in between.
#[derive(Debug, Clone)]
pub struct Transferer {
    client: reqwest::Client,
    options: TransferOptions,
}

impl Transferer {
    /// Create a transferer, building the shared HTTP client
    pub fn new(options: TransferOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, options })
    }

    /// Download a URL to a file
    ///
    /// Never returns `Err`: failures after the final retry are reported in
    /// the result's `success`/`error` fields.
    pub async fn download<P: AsRef<Path>>(&self, url: &str, destination: P) -> TransferResult {
        self.with_retry(url, destination.as_ref(), "download", |url, dest| {
            self.stream_to_file(url, dest)
        })
        .await
    }

    /// Download a URL with sequential `Range` requests of `chunk_size` bytes
    ///
    /// Falls back to a plain download when the server does not advertise a
    /// length or ignores ranges.
    pub async fn download_chunked<P: AsRef<Path>>(
        &self,
        url: &str,
        destination: P,
    ) -> TransferResult {
        self.with_retry(url, destination.as_ref(), "chunked", |url, dest| {
            self.stream_ranges_to_file(url, dest)
        })
        .await
    }

    /// Download several URLs concurrently, bounded by the configured
    /// concurrency, results in input order
    ///
    /// Batch `success` is true iff at least one download succeeded.
    pub async fn download_many(
        &self,
        items: &[(String, PathBuf)],
    ) -> ProbeBatch<TransferResult> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));

        let mut handles = Vec::with_capacity(items.len());
        for (url, destination) in items {
            let url = url.clone();
            let destination = destination.clone();
            let transferer = self.clone();
            let permit_source = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = permit_source.acquire_owned().await;
                let mut result = transferer.download(&url, &destination).await;
                result.method = "concurrent".to_string();
                result
            }));
        }

        let mut results = Vec::with_capacity(items.len());
        let mut errors = Vec::with_capacity(items.len());
        for handle in handles {
            match handle.await {
                Ok(result) => {
                    errors.push(result.error.clone());
                    results.push(Some(result));
                }
                Err(e) => {
                    errors.push(Some(format!("download task failed: {}", e)));
                    results.push(None);
                }
            }
        }

        let success = results
            .iter()
            .any(|r| r.as_ref().is_some_and(|t| t.success));
        ProbeBatch {
            results,
            errors,
            duration: start.elapsed(),
            concurrency: self.options.concurrency,
            success,
        }
    }

    async fn with_retry<'a, F, Fut>(
        &'a self,
        url: &'a str,
        destination: &'a Path,
        method: &str,
        attempt_fn: F,
    ) -> TransferResult
    where
        F: Fn(&'a str, &'a Path) -> Fut,
        Fut: std::future::Future<Output = Result<u64>> + 'a,
    {
        let start = Instant::now();
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.options.retry.attempts.max(1) {
            attempts += 1;
            match attempt_fn(url, destination).await {
                Ok(bytes) => {
                    let duration = start.elapsed();
                    info!(
                        "Downloaded {} -> {}: {} bytes in {:?} ({} attempt(s))",
                        url,
                        destination.display(),
                        bytes,
                        duration,
                        attempts
                    );
                    return TransferResult {
                        url: url.to_string(),
                        destination: destination.to_path_buf(),
                        bytes_transferred: bytes,
                        duration,
                        rate_mbps: rate_mbps(bytes, duration),
                        method: method.to_string(),
                        attempts,
                        success: true,
                        error: None,
                    };
                }
                Err(e) => {
                    warn!(
                        "Download attempt {} of {} failed for {}: {}",
                        attempts, self.options.retry.attempts, url, e
                    );
                    last_error = Some(e.to_string());
                    if attempts < self.options.retry.attempts {
                        tokio::time::sleep(self.options.retry.delay).await;
                    }
                }
            }
        }

        TransferResult {
            url: url.to_string(),
            destination: destination.to_path_buf(),
            bytes_transferred: 0,
            duration: start.elapsed(),
            rate_mbps: 0.0,
            method: method.to_string(),
            attempts,
            success: false,
            error: last_error,
        }
    }

    async fn stream_to_file(&self, url: &str, destination: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("request to {} failed: {}", url, e)))?
            .error_for_status()
            .map_err(|e| Error::http(format!("{} returned an error status: {}", url, e)))?;

        let mut file = create_destination(destination).await?;
        let mut response = response;
        let mut bytes = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::http(format!("read from {} failed: {}", url, e)))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::http(format!("write to {} failed: {}", destination.display(), e)))?;
            bytes += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| Error::http(format!("flush of {} failed: {}", destination.display(), e)))?;
        Ok(bytes)
    }

    async fn stream_ranges_to_file(&self, url: &str, destination: &Path) -> Result<u64> {
        let head = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("HEAD request to {} failed: {}", url, e)))?;
        let total = head.content_length();
        let accepts_ranges = head
            .headers()
            .get(reqwest::header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("bytes"));

        let Some(total) = total.filter(|_| accepts_ranges) else {
            debug!("{} does not support ranges, falling back to plain download", url);
            return self.stream_to_file(url, destination).await;
        };

        let mut file = create_destination(destination).await?;
        let chunk_size = self.options.chunk_size.max(1);
        let mut offset = 0u64;
        let mut bytes = 0u64;

        while offset < total {
            let end = (offset + chunk_size - 1).min(total - 1);
            let mut response = self
                .client
                .get(url)
                .header(reqwest::header::RANGE, format!("bytes={}-{}", offset, end))
                .send()
                .await
                .map_err(|e| Error::http(format!("range request to {} failed: {}", url, e)))?
                .error_for_status()
                .map_err(|e| Error::http(format!("{} returned an error status: {}", url, e)))?;

            if response.status() != reqwest::StatusCode::PARTIAL_CONTENT {
                // server ignored the range and sent the whole body
                debug!("{} ignored the range request, taking the full body", url);
                bytes = 0;
                file = create_destination(destination).await?;
                while let Some(chunk) = response
                    .chunk()
                    .await
                    .map_err(|e| Error::http(format!("read from {} failed: {}", url, e)))?
                {
                    file.write_all(&chunk).await.map_err(|e| {
                        Error::http(format!("write to {} failed: {}", destination.display(), e))
                    })?;
                    bytes += chunk.len() as u64;
                }
                file.flush().await.map_err(|e| {
                    Error::http(format!("flush of {} failed: {}", destination.display(), e))
                })?;
                return Ok(bytes);
            }

            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| Error::http(format!("read from {} failed: {}", url, e)))?
            {
                file.write_all(&chunk).await.map_err(|e| {
                    Error::http(format!("write to {} failed: {}", destination.display(), e))
                })?;
                bytes += chunk.len() as u64;
            }
            offset = end + 1;
        }

        file.flush()
            .await
            .map_err(|e| Error::http(format!("flush of {} failed: {}", destination.display(), e)))?;
        Ok(bytes)
    }
}

async fn create_destination(path: &Path) -> Result<tokio::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::http(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    tokio::fs::File::create(path)
        .await
        .map_err(|e| Error::http(format!("failed to create {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const BODY: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    /// Minimal HTTP server: serves BODY, honoring single-range requests
    async fn serve(listener: TcpListener, support_ranges: bool) {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let is_head = request.starts_with("HEAD");
                let range = request
                    .lines()
                    .find_map(|l| l.strip_prefix("Range: bytes="))
                    .and_then(|r| {
                        let (a, b) = r.trim().split_once('-')?;
                        Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?))
                    });

                let response = match range.filter(|_| support_ranges) {
                    Some((start, end)) => {
                        let end = end.min(BODY.len() - 1);
                        let slice = &BODY[start..=end];
                        let mut r = format!(
                            "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\nConnection: close\r\n\r\n",
                            slice.len(), start, end, BODY.len()
                        )
                        .into_bytes();
                        r.extend_from_slice(slice);
                        r
                    }
                    None => {
                        let accept = if support_ranges {
                            "Accept-Ranges: bytes\r\n"
                        } else {
                            ""
                        };
                        let mut r = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
                            BODY.len(),
                            accept
                        )
                        .into_bytes();
                        if !is_head {
                            r.extend_from_slice(BODY);
                        }
                        r
                    }
                };
                let _ = stream.write_all(&response).await;
                let _ = stream.shutdown().await;
            });
        }
    }

    async fn start_server(support_ranges: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, support_ranges));
        format!("http://{}", addr)
    }

    fn fast_transferer(chunk_size: u64) -> Transferer {
        Transferer::new(TransferOptions {
            chunk_size,
            concurrency: 4,
            retry: RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(10),
            },
            connect_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_download_streams_body() {
        let base = start_server(false).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("body.bin");

        let result = fast_transferer(8).download(&format!("{}/f", base), &dest).await;
        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.bytes_transferred, BODY.len() as u64);
        assert_eq!(result.attempts, 1);
        assert_eq!(std::fs::read(&dest).unwrap(), BODY);
    }

    #[tokio::test]
    async fn test_chunked_download_reassembles_ranges() {
        let base = start_server(true).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("chunked.bin");

        // 10-byte ranges over a 36-byte body
        let result = fast_transferer(10)
            .download_chunked(&format!("{}/f", base), &dest)
            .await;
        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.bytes_transferred, BODY.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), BODY);
    }

    #[tokio::test]
    async fn test_chunked_falls_back_without_range_support() {
        let base = start_server(false).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("fallback.bin");

        let result = fast_transferer(10)
            .download_chunked(&format!("{}/f", base), &dest)
            .await;
        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(std::fs::read(&dest).unwrap(), BODY);
    }

    #[tokio::test]
    async fn test_unreachable_url_exhausts_retries() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("never.bin");

        let result = fast_transferer(8)
            .download("http://127.0.0.1:1/f", &dest)
            .await;
        assert!(!result.success);
        assert_eq!(result.attempts, 2);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_download_many_in_input_order() {
        let base = start_server(false).await;
        let dir = tempfile::tempdir().unwrap();

        let items = vec![
            ("http://127.0.0.1:1/f".to_string(), dir.path().join("a.bin")),
            (format!("{}/f", base), dir.path().join("b.bin")),
        ];
        let batch = fast_transferer(8).download_many(&items).await;

        assert_eq!(batch.results.len(), 2);
        assert!(!batch.results[0].as_ref().unwrap().success);
        let ok = batch.results[1].as_ref().unwrap();
        assert!(ok.success);
        assert_eq!(ok.method, "concurrent");
        assert!(batch.success);
        assert_eq!(std::fs::read(dir.path().join("b.bin")).unwrap(), BODY);
    }
}
