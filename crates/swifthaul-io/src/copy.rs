//! Single-file streaming copy with in-flight digest

use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;
use swifthaul_types::{rate_mbps, Error, FileCopyResult, Result};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

/// Copy options for customizing copy behavior
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Buffer size for the read/write loop
    pub buffer_size: usize,
    /// Maximum files copied concurrently in a tree copy; `None` is unbounded
    pub concurrency: Option<usize>,
    /// Preserve original permission bits
    pub preserve_permissions: bool,
    /// Preserve access and modification times
    pub preserve_timestamps: bool,
    /// Sync the destination file to disk before reporting success
    pub fsync: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            buffer_size: 1024 * 1024,
            concurrency: None,
            preserve_permissions: true,
            preserve_timestamps: true,
            fsync: true,
        }
    }
}

/// Streaming copy engine
#[derive(Debug, Clone)]
pub struct Copier {
    options: CopyOptions,
}

impl Copier {
    /// Create a new copier
    pub fn new(options: CopyOptions) -> Self {
        Self { options }
    }

    /// Options this copier was built with
    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Copy one file, computing a SHA-256 of the bytes as they are written
    ///
    /// The destination's parent directory is created if absent. Any failure
    /// to open, create, write, or sync is terminal for this file: no
    /// partial-success object is returned.
    pub async fn copy_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
    ) -> Result<FileCopyResult> {
        let source = source.as_ref();
        let destination = destination.as_ref();
        let start = Instant::now();

        debug!("Copying {} -> {}", source.display(), destination.display());

        let source_meta = fs::metadata(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                Error::copy(format!("failed to stat {}: {}", source.display(), e))
            }
        })?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::copy(format!(
                        "failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut reader = File::open(source)
            .await
            .map_err(|e| Error::copy(format!("failed to open {}: {}", source.display(), e)))?;
        let mut writer = File::create(destination).await.map_err(|e| {
            Error::copy(format!(
                "failed to create {}: {}",
                destination.display(),
                e
            ))
        })?;

        // Fan-out write path: every buffer goes to the destination and the
        // digest state in the same pass.
        let mut digest = Sha256::new();
        let mut buffer = vec![0u8; self.options.buffer_size];
        let mut bytes_copied = 0u64;
        loop {
            let n = reader
                .read(&mut buffer)
                .await
                .map_err(|e| Error::copy(format!("failed to read {}: {}", source.display(), e)))?;
            if n == 0 {
                break;
            }
            writer.write_all(&buffer[..n]).await.map_err(|e| {
                Error::copy(format!("failed to write {}: {}", destination.display(), e))
            })?;
            digest.update(&buffer[..n]);
            bytes_copied += n as u64;
        }

        if self.options.fsync {
            writer.sync_all().await.map_err(|e| {
                Error::copy(format!("failed to sync {}: {}", destination.display(), e))
            })?;
        }
        drop(writer);

        self.preserve_metadata(destination, &source_meta).await?;

        let duration = start.elapsed();
        info!(
            "Copied {} bytes {} -> {} in {:?}",
            bytes_copied,
            source.display(),
            destination.display(),
            duration
        );

        Ok(FileCopyResult {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            bytes_copied,
            duration,
            sha256: hex::encode(digest.finalize()),
            rate_mbps: rate_mbps(bytes_copied, duration),
            success: true,
        })
    }

    /// Carry permission bits and timestamps over to the destination
    async fn preserve_metadata(
        &self,
        destination: &Path,
        source_meta: &std::fs::Metadata,
    ) -> Result<()> {
        if self.options.preserve_permissions {
            fs::set_permissions(destination, source_meta.permissions())
                .await
                .map_err(|e| {
                    Error::copy(format!(
                        "failed to set permissions on {}: {}",
                        destination.display(),
                        e
                    ))
                })?;
        }

        if self.options.preserve_timestamps {
            let accessed = source_meta
                .accessed()
                .unwrap_or_else(|_| std::time::SystemTime::now());
            let modified = source_meta
                .modified()
                .unwrap_or_else(|_| std::time::SystemTime::now());
            filetime::set_file_times(
                destination,
                filetime::FileTime::from_system_time(accessed),
                filetime::FileTime::from_system_time(modified),
            )
            .map_err(|e| {
                Error::copy(format!(
                    "failed to set file times on {}: {}",
                    destination.display(),
                    e
                ))
            })?;
        }

        Ok(())
    }
}

impl Default for Copier {
    fn default() -> Self {
        Self::new(CopyOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swifthaul_hash::Hasher;

    #[tokio::test]
    async fn test_copy_file_bytes_and_digest() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("out").join("dst.bin");
        let content = b"the quick brown fox jumps over the lazy dog".repeat(100);
        std::fs::write(&src, &content).unwrap();

        let result = Copier::default().copy_file(&src, &dst).await.unwrap();
        assert!(result.success);
        assert_eq!(result.bytes_copied, content.len() as u64);
        assert_eq!(std::fs::read(&dst).unwrap(), content);

        // The in-flight digest must match a fresh hash of the destination
        let dest_hash = Hasher::default().hash_file(&dst).await;
        assert_eq!(result.sha256, dest_hash.sha256);
    }

    #[tokio::test]
    async fn test_copy_missing_source_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("missing.bin");
        let dst = dir.path().join("dst.bin");

        let err = Copier::default().copy_file(&src, &dst).await;
        assert!(err.is_err());
        assert!(!dst.exists());
    }

    #[tokio::test]
    async fn test_copy_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("empty.bin");
        let dst = dir.path().join("dst.bin");
        std::fs::write(&src, b"").unwrap();

        let result = Copier::default().copy_file(&src, &dst).await.unwrap();
        assert_eq!(result.bytes_copied, 0);
        assert_eq!(result.rate_mbps, 0.0);
        // SHA-256 of the empty string
        assert_eq!(
            result.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("script.sh");
        let dst = dir.path().join("copy.sh");
        std::fs::write(&src, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755)).unwrap();

        Copier::default().copy_file(&src, &dst).await.unwrap();
        let mode = std::fs::metadata(&dst).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
