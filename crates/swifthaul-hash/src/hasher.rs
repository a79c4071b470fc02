//! Single-pass multi-digest hashing engine

use crate::algorithm::HashAlgorithm;
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use swifthaul_types::{ChecksumBatch, ChecksumResult, Error, Result};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Read buffer size for the streaming pass
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Options for hashing operations
#[derive(Debug, Clone)]
pub struct HashOptions {
    /// Maximum files hashed concurrently; `None` spawns one task per file
    pub concurrency: Option<usize>,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self { concurrency: None }
    }
}

/// All three digest states updated from the same read buffer
///
/// This is the fan-out that lets a file be read from disk exactly once
/// while producing every digest the orchestrator wants.
#[derive(Debug, Default)]
pub struct MultiDigest {
    md5: Md5,
    sha1: Sha1,
    sha256: Sha256,
}

impl MultiDigest {
    /// Create fresh digest states
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one buffer into all three digests
    pub fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
        self.sha1.update(data);
        self.sha256.update(data);
    }

    /// Finalize into lowercase hex strings `(md5, sha1, sha256)`
    pub fn finalize(self) -> (String, String, String) {
        (
            hex::encode(self.md5.finalize()),
            hex::encode(self.sha1.finalize()),
            hex::encode(self.sha256.finalize()),
        )
    }
}

/// Parallel multi-digest file hasher
#[derive(Debug, Clone)]
pub struct Hasher {
    options: HashOptions,
}

impl Hasher {
    /// Create a new hasher
    pub fn new(options: HashOptions) -> Self {
        Self { options }
    }

    /// Hash one file, producing a result even when the file is unreadable
    ///
    /// The file is stat'ed first so its size survives a later read failure.
    pub async fn hash_file<P: AsRef<Path>>(&self, path: P) -> ChecksumResult {
        let path = path.as_ref();

        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!("Failed to stat {}: {}", path.display(), e);
                return ChecksumResult::failed(path, format!("failed to stat: {}", e));
            }
        };

        match Self::digest_file(path).await {
            Ok((md5, sha1, sha256)) => ChecksumResult {
                path: path.to_path_buf(),
                md5,
                sha1,
                sha256,
                size,
                error: None,
            },
            Err(e) => {
                warn!("Failed to hash {}: {}", path.display(), e);
                let mut result = ChecksumResult::failed(path, e.to_string());
                result.size = size;
                result
            }
        }
    }

    /// Hash a list of files in parallel
    ///
    /// Results come back 1:1 with the input list, in input order. The batch
    /// always reports `success: true`; per-file failures are visible only in
    /// each result's `error` field.
    pub async fn hash_files(&self, paths: &[PathBuf]) -> Result<ChecksumBatch> {
        let start = Instant::now();
        let semaphore = self
            .options
            .concurrency
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

        let mut handles = Vec::with_capacity(paths.len());
        for path in paths {
            let hasher = self.clone();
            let path = path.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match &semaphore {
                    Some(sem) => Some(sem.acquire().await.map_err(|e| Error::hash(e.to_string()))?),
                    None => None,
                };
                Ok::<_, Error>(hasher.hash_file(&path).await)
            }));
        }

        let mut results = Vec::with_capacity(paths.len());
        for (handle, path) in handles.into_iter().zip(paths) {
            match handle.await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => results.push(ChecksumResult::failed(path, e.to_string())),
                Err(e) => results.push(ChecksumResult::failed(path, format!("task failed: {}", e))),
            }
        }

        debug!(
            "Hashed {} files in {:?}",
            results.len(),
            start.elapsed()
        );

        Ok(ChecksumBatch {
            results,
            success: true,
            duration: start.elapsed(),
        })
    }

    /// Hash every regular file under a directory root
    ///
    /// Directories themselves are skipped and symlinks are not followed.
    /// Failure to walk the tree is a systemic error that aborts before any
    /// per-file work.
    pub async fn hash_directory<P: AsRef<Path>>(&self, root: P) -> Result<ChecksumBatch> {
        let root = root.as_ref();
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|e| {
                Error::hash(format!("failed to walk {}: {}", root.display(), e))
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        debug!("Hashing {} files under {}", files.len(), root.display());
        self.hash_files(&files).await
    }

    /// Recompute one algorithm for a file and compare against an expected digest
    ///
    /// Comparison is ASCII case-insensitive; digests are emitted lowercase
    /// but expected values from elsewhere may be uppercase. An unsupported
    /// algorithm name is an error at the call site, never a false match.
    pub async fn verify_checksum<P: AsRef<Path>>(
        &self,
        path: P,
        expected: &str,
        algorithm: HashAlgorithm,
    ) -> Result<bool> {
        let (md5, sha1, sha256) = Self::digest_file(path.as_ref()).await?;
        let actual = match algorithm {
            HashAlgorithm::Md5 => md5,
            HashAlgorithm::Sha1 => sha1,
            HashAlgorithm::Sha256 => sha256,
        };
        Ok(actual.eq_ignore_ascii_case(expected))
    }

    /// Stream a file through all three digests in one pass
    async fn digest_file(path: &Path) -> Result<(String, String, String)> {
        let mut file = File::open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                Error::hash(format!("failed to open {}: {}", path.display(), e))
            }
        })?;

        let mut digest = MultiDigest::new();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|e| Error::hash(format!("failed to read {}: {}", path.display(), e)))?;
            if n == 0 {
                break;
            }
            digest.update(&buffer[..n]);
        }

        Ok(digest.finalize())
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(HashOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create file");
        file.write_all(content).expect("write file");
        path
    }

    #[tokio::test]
    async fn test_known_answer_digests() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "hello.txt", b"hello");

        let result = Hasher::default().hash_file(&path).await;
        assert!(result.is_ok());
        assert_eq!(result.md5, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(result.sha1, "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        assert_eq!(
            result.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(result.size, 5);
    }

    #[tokio::test]
    async fn test_digest_lengths_and_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "data.bin", &[0xAB; 1000]);

        let result = Hasher::default().hash_file(&path).await;
        assert_eq!(result.md5.len(), 32);
        assert_eq!(result.sha1.len(), 40);
        assert_eq!(result.sha256.len(), 64);
        for digest in [&result.md5, &result.sha1, &result.sha256] {
            assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[tokio::test]
    async fn test_hashing_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "stable.txt", b"unchanged content");

        let hasher = Hasher::default();
        let first = hasher.hash_file(&path).await;
        let second = hasher.hash_file(&path).await;
        assert_eq!(first.sha256, second.sha256);
        assert_eq!(first.md5, second.md5);
    }

    #[tokio::test]
    async fn test_missing_file_does_not_fail_batch() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "good.txt", b"content");
        let missing = dir.path().join("missing.txt");

        let batch = Hasher::default()
            .hash_files(&[missing.clone(), good.clone()])
            .await
            .unwrap();

        assert!(batch.success);
        assert_eq!(batch.results.len(), 2);
        assert_eq!(batch.results[0].path, missing);
        assert!(batch.results[0].error.is_some());
        assert!(batch.results[0].md5.is_empty());
        assert!(batch.results[1].is_ok());
        assert_eq!(batch.error_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..8)
            .map(|i| write_file(&dir, &format!("f{}.txt", i), format!("file {}", i).as_bytes()))
            .collect();

        let hasher = Hasher::new(HashOptions {
            concurrency: Some(3),
        });
        let batch = hasher.hash_files(&paths).await.unwrap();
        assert_eq!(batch.results.len(), paths.len());
        for (result, path) in batch.results.iter().zip(&paths) {
            assert_eq!(&result.path, path);
        }
    }

    #[tokio::test]
    async fn test_hash_directory_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "a.txt", b"a");
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let sub = dir.path().join("sub").join("b.txt");
        std::fs::write(&sub, b"b").unwrap();

        let batch = Hasher::default().hash_directory(dir.path()).await.unwrap();
        assert_eq!(batch.results.len(), 2);
        assert!(batch.results.iter().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn test_verify_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "v.txt", b"hello");

        let hasher = Hasher::default();
        let ok = hasher
            .verify_checksum(&path, "5d41402abc4b2a76b9719d911017c592", HashAlgorithm::Md5)
            .await
            .unwrap();
        assert!(ok);

        // Uppercase expected digests still match
        let ok = hasher
            .verify_checksum(&path, "5D41402ABC4B2A76B9719D911017C592", HashAlgorithm::Md5)
            .await
            .unwrap();
        assert!(ok);

        let bad = hasher
            .verify_checksum(&path, "deadbeef", HashAlgorithm::Md5)
            .await
            .unwrap();
        assert!(!bad);
    }

    #[tokio::test]
    async fn test_verify_checksum_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let err = Hasher::default()
            .verify_checksum(&missing, "deadbeef", HashAlgorithm::Sha256)
            .await;
        assert!(err.is_err());
    }
}
