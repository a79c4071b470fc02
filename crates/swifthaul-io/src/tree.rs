//! Directory tree copy with per-file parallelism

use crate::copy::Copier;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use swifthaul_types::{rate_mbps, DirectoryCopyResult, Error, Result};
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

impl Copier {
    /// Copy a whole directory tree
    ///
    /// The mirrored directory structure is created serially first, then one
    /// task per regular file runs the streaming copy. The first file-level
    /// error is recorded and returned once every in-flight copy has drained;
    /// there is no mid-flight cancellation. Symlinks and other non-regular
    /// entries are skipped.
    pub async fn copy_directory<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
    ) -> Result<DirectoryCopyResult> {
        let source = source.as_ref();
        let destination = destination.as_ref();
        let start = Instant::now();

        let source_meta = fs::metadata(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                Error::copy(format!("failed to stat {}: {}", source.display(), e))
            }
        })?;
        if !source_meta.is_dir() {
            return Err(Error::copy(format!(
                "{} is not a directory",
                source.display()
            )));
        }

        // Walk once, splitting directories from regular files. A walk
        // failure aborts before any per-file work.
        let mut directories = Vec::new();
        let mut files = Vec::new();
        for entry in WalkDir::new(source).follow_links(false) {
            let entry = entry.map_err(|e| {
                Error::copy(format!("failed to walk {}: {}", source.display(), e))
            })?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| Error::copy(format!("path outside source root: {}", e)))?
                .to_path_buf();
            if entry.file_type().is_dir() {
                directories.push(relative);
            } else if entry.file_type().is_file() {
                files.push(relative);
            }
        }

        // Mirror the structure serially before any file goes in flight.
        let mut directories_created = 0u64;
        for relative in &directories {
            let target = destination.join(relative);
            fs::create_dir_all(&target).await.map_err(|e| {
                Error::copy(format!(
                    "failed to create directory {}: {}",
                    target.display(),
                    e
                ))
            })?;
            directories_created += 1;
        }

        debug!(
            "Copying {} files under {} with {} directories",
            files.len(),
            source.display(),
            directories_created
        );

        let semaphore = self
            .options()
            .concurrency
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

        let mut handles = Vec::with_capacity(files.len());
        for relative in files {
            let copier = self.clone();
            let src = source.join(&relative);
            let dst = destination.join(&relative);
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match &semaphore {
                    Some(sem) => Some(sem.acquire().await.map_err(|e| Error::copy(e.to_string()))?),
                    None => None,
                };
                copier.copy_file(&src, &dst).await
            }));
        }

        let mut bytes_copied = 0u64;
        let mut files_copied = 0u64;
        let mut first_error: Option<String> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(result)) => {
                    bytes_copied += result.bytes_copied;
                    files_copied += 1;
                }
                Ok(Err(e)) => {
                    warn!("File copy failed: {}", e);
                    if first_error.is_none() {
                        first_error = Some(e.to_string());
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(format!("copy task failed: {}", e));
                    }
                }
            }
        }

        let duration = start.elapsed();
        info!(
            "Directory copy {} -> {}: {} files, {} bytes in {:?}",
            source.display(),
            destination.display(),
            files_copied,
            bytes_copied,
            duration
        );

        Ok(DirectoryCopyResult {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            files_copied,
            directories_created,
            bytes_copied,
            duration,
            rate_mbps: rate_mbps(bytes_copied, duration),
            success: first_error.is_none(),
            error: first_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::CopyOptions;

    fn build_tree(root: &Path) -> u64 {
        std::fs::create_dir_all(root.join("sub").join("deep")).unwrap();
        let files: [(&str, &[u8]); 3] = [
            ("a.txt", b"alpha"),
            ("sub/b.txt", b"bravo bravo"),
            ("sub/deep/c.txt", b"charlie charlie charlie"),
        ];
        let mut total = 0;
        for (name, content) in files {
            std::fs::write(root.join(name), content).unwrap();
            total += content.len() as u64;
        }
        total
    }

    #[tokio::test]
    async fn test_copy_directory_mirrors_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        let total = build_tree(&src);

        let result = Copier::default().copy_directory(&src, &dst).await.unwrap();
        assert!(result.success);
        assert_eq!(result.files_copied, 3);
        assert_eq!(result.bytes_copied, total);
        assert!(result.directories_created >= 3); // root, sub, sub/deep

        assert_eq!(std::fs::read(dst.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(
            std::fs::read(dst.join("sub").join("deep").join("c.txt")).unwrap(),
            b"charlie charlie charlie"
        );
    }

    #[tokio::test]
    async fn test_copy_directory_bounded_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        build_tree(&src);

        let copier = Copier::new(CopyOptions {
            concurrency: Some(1),
            ..CopyOptions::default()
        });
        let result = copier.copy_directory(&src, &dst).await.unwrap();
        assert_eq!(result.files_copied, 3);
    }

    #[tokio::test]
    async fn test_copy_missing_directory_is_systemic_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Copier::default()
            .copy_directory(dir.path().join("nope"), dir.path().join("dst"))
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_copy_file_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();

        let err = Copier::default()
            .copy_directory(&file, dir.path().join("dst"))
            .await;
        assert!(err.is_err());
    }
}
