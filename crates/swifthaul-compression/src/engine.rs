//! Compression and decompression engine

use crate::format::ArchiveFormat;
use flate2::Compression;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use swifthaul_types::{CompressionResult, Error, Result};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Options for the compression engine
#[derive(Debug, Clone)]
pub struct CompressionOptions {
    /// gzip compression level (0-9)
    pub gzip_level: u32,
    /// zstd compression level (1-22)
    pub zstd_level: i32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            gzip_level: 6,
            zstd_level: 3,
        }
    }
}

/// Compression engine for files and directory trees
#[derive(Debug, Clone)]
pub struct Compressor {
    options: CompressionOptions,
}

impl Compressor {
    /// Create a new compressor
    pub fn new(options: CompressionOptions) -> Self {
        Self { options }
    }

    /// Compress a file or directory tree to a destination path
    ///
    /// When `format` is `None` the method is inferred from the destination
    /// filename's suffix. Single-file methods (gzip, zstd) require a regular
    /// file source; archive methods (tar, tar.gz, tar.zst) require a
    /// directory. Errors are terminal: no partial output is guaranteed valid.
    pub async fn compress<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
        format: Option<ArchiveFormat>,
    ) -> Result<CompressionResult> {
        let source = source.as_ref().to_path_buf();
        let destination = destination.as_ref().to_path_buf();
        let format = match format {
            Some(f) => f,
            None => ArchiveFormat::from_path(&destination)?,
        };
        let start = Instant::now();

        let meta = std::fs::metadata(&source).map_err(|_| Error::FileNotFound {
            path: source.clone(),
        })?;
        if format.is_archive() && !meta.is_dir() {
            return Err(Error::compression(format!(
                "{} requires a directory source, {} is a file",
                format,
                source.display()
            )));
        }
        if !format.is_archive() && !meta.is_file() {
            return Err(Error::compression(format!(
                "{} requires a file source, {} is a directory",
                format,
                source.display()
            )));
        }

        debug!(
            "Compressing {} -> {} ({})",
            source.display(),
            destination.display(),
            format
        );

        let options = self.options.clone();
        let src = source.clone();
        let dst = destination.clone();
        let (original_size, compressed_size, entries) =
            tokio::task::spawn_blocking(move || match format {
                ArchiveFormat::Gzip => compress_file_gzip(&src, &dst, options.gzip_level),
                ArchiveFormat::Zstd => compress_file_zstd(&src, &dst, options.zstd_level),
                ArchiveFormat::Tar | ArchiveFormat::TarGzip | ArchiveFormat::TarZstd => {
                    compress_tree(&src, &dst, format, &options)
                }
            })
            .await
            .map_err(|e| Error::compression(format!("compression task failed: {}", e)))??;

        let duration = start.elapsed();
        info!(
            "Compressed {} -> {}: {} -> {} bytes in {:?}",
            source.display(),
            destination.display(),
            original_size,
            compressed_size,
            duration
        );

        Ok(CompressionResult {
            source,
            destination,
            method: format.to_string(),
            original_size,
            compressed_size,
            ratio: CompressionResult::compute_ratio(original_size, compressed_size),
            duration,
            entries,
            success: true,
        })
    }

    /// Decompress a file or extract an archive
    ///
    /// The method is inferred from the *source* filename when not supplied.
    /// Archive entries are extracted under `destination` preserving relative
    /// paths and file modes; entries that would escape the destination root
    /// are refused. `original_size` in the result is the decompressed byte
    /// total; `compressed_size` is the source file's on-disk size.
    pub async fn decompress<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
        format: Option<ArchiveFormat>,
    ) -> Result<CompressionResult> {
        let source = source.as_ref().to_path_buf();
        let destination = destination.as_ref().to_path_buf();
        let format = match format {
            Some(f) => f,
            None => ArchiveFormat::from_path(&source)?,
        };
        let start = Instant::now();

        let compressed_size = std::fs::metadata(&source)
            .map_err(|_| Error::FileNotFound {
                path: source.clone(),
            })?
            .len();

        debug!(
            "Decompressing {} -> {} ({})",
            source.display(),
            destination.display(),
            format
        );

        let src = source.clone();
        let dst = destination.clone();
        let (original_size, entries) = tokio::task::spawn_blocking(move || match format {
            ArchiveFormat::Gzip => decompress_file_gzip(&src, &dst).map(|n| (n, None)),
            ArchiveFormat::Zstd => decompress_file_zstd(&src, &dst).map(|n| (n, None)),
            ArchiveFormat::Tar | ArchiveFormat::TarGzip | ArchiveFormat::TarZstd => {
                extract_tree(&src, &dst, format)
            }
        })
        .await
        .map_err(|e| Error::compression(format!("decompression task failed: {}", e)))??;

        let duration = start.elapsed();
        info!(
            "Decompressed {} -> {}: {} bytes in {:?}",
            source.display(),
            destination.display(),
            original_size,
            duration
        );

        Ok(CompressionResult {
            source,
            destination,
            method: format.to_string(),
            original_size,
            compressed_size,
            ratio: CompressionResult::compute_ratio(original_size, compressed_size),
            duration,
            entries,
            success: true,
        })
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(CompressionOptions::default())
    }
}

fn open_source(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        Error::compression(format!("failed to open {}: {}", path.display(), e))
    })
}

fn create_destination(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::compression(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    File::create(path)
        .map_err(|e| Error::compression(format!("failed to create {}: {}", path.display(), e)))
}

fn compress_file_gzip(src: &Path, dst: &Path, level: u32) -> Result<(u64, u64, Option<u64>)> {
    let mut reader = open_source(src)?;
    let writer = create_destination(dst)?;
    let mut encoder = flate2::write::GzEncoder::new(writer, Compression::new(level));
    let original = io::copy(&mut reader, &mut encoder)
        .map_err(|e| Error::compression(format!("gzip compress: {}", e)))?;
    let mut file = encoder
        .finish()
        .map_err(|e| Error::compression(format!("gzip finish: {}", e)))?;
    file.flush()
        .map_err(|e| Error::compression(format!("gzip flush: {}", e)))?;
    Ok((original, destination_size(dst)?, None))
}

fn compress_file_zstd(src: &Path, dst: &Path, level: i32) -> Result<(u64, u64, Option<u64>)> {
    let mut reader = open_source(src)?;
    let writer = create_destination(dst)?;
    let mut encoder = zstd::stream::write::Encoder::new(writer, level)
        .map_err(|e| Error::compression(format!("zstd encoder: {}", e)))?;
    let original = io::copy(&mut reader, &mut encoder)
        .map_err(|e| Error::compression(format!("zstd compress: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| Error::compression(format!("zstd finish: {}", e)))?;
    Ok((original, destination_size(dst)?, None))
}

/// Archive a directory tree, streaming each file into the tar writer
fn compress_tree(
    src: &Path,
    dst: &Path,
    format: ArchiveFormat,
    options: &CompressionOptions,
) -> Result<(u64, u64, Option<u64>)> {
    let writer = create_destination(dst)?;
    let writer: Box<dyn Write> = match format {
        ArchiveFormat::Tar => Box::new(writer),
        ArchiveFormat::TarGzip => Box::new(flate2::write::GzEncoder::new(
            writer,
            Compression::new(options.gzip_level),
        )),
        ArchiveFormat::TarZstd => Box::new(
            zstd::stream::write::Encoder::new(writer, options.zstd_level)
                .map_err(|e| Error::compression(format!("zstd encoder: {}", e)))?
                .auto_finish(),
        ),
        _ => unreachable!("single-file formats are handled by the caller"),
    };

    let mut builder = tar::Builder::new(writer);
    let mut original = 0u64;
    let mut file_count = 0u64;

    for entry in WalkDir::new(src).follow_links(false) {
        let entry =
            entry.map_err(|e| Error::compression(format!("failed to walk {}: {}", src.display(), e)))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::compression(format!("path outside source root: {}", e)))?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        if entry.file_type().is_dir() {
            builder.append_dir(relative, entry.path()).map_err(|e| {
                Error::compression(format!("failed to archive {}: {}", relative.display(), e))
            })?;
        } else if entry.file_type().is_file() {
            original += entry
                .metadata()
                .map_err(|e| Error::compression(format!("failed to stat: {}", e)))?
                .len();
            builder
                .append_path_with_name(entry.path(), relative)
                .map_err(|e| {
                    Error::compression(format!("failed to archive {}: {}", relative.display(), e))
                })?;
            file_count += 1;
        }
    }

    let mut writer = builder
        .into_inner()
        .map_err(|e| Error::compression(format!("failed to finish archive: {}", e)))?;
    writer
        .flush()
        .map_err(|e| Error::compression(format!("failed to flush archive: {}", e)))?;
    drop(writer);

    Ok((original, destination_size(dst)?, Some(file_count)))
}

fn decompress_file_gzip(src: &Path, dst: &Path) -> Result<u64> {
    let reader = open_source(src)?;
    let mut decoder = flate2::read::GzDecoder::new(reader);
    let mut writer = create_destination(dst)?;
    io::copy(&mut decoder, &mut writer)
        .map_err(|e| Error::compression(format!("gzip decompress: {}", e)))
}

fn decompress_file_zstd(src: &Path, dst: &Path) -> Result<u64> {
    let reader = open_source(src)?;
    let mut decoder = zstd::stream::read::Decoder::new(reader)
        .map_err(|e| Error::compression(format!("zstd decoder: {}", e)))?;
    let mut writer = create_destination(dst)?;
    io::copy(&mut decoder, &mut writer)
        .map_err(|e| Error::compression(format!("zstd decompress: {}", e)))
}

/// Extract an archive under the destination root
fn extract_tree(src: &Path, dst: &Path, format: ArchiveFormat) -> Result<(u64, Option<u64>)> {
    let reader = open_source(src)?;
    let reader: Box<dyn Read> = match format {
        ArchiveFormat::Tar => Box::new(reader),
        ArchiveFormat::TarGzip => Box::new(flate2::read::GzDecoder::new(reader)),
        ArchiveFormat::TarZstd => Box::new(
            zstd::stream::read::Decoder::new(reader)
                .map_err(|e| Error::compression(format!("zstd decoder: {}", e)))?,
        ),
        _ => unreachable!("single-file formats are handled by the caller"),
    };

    std::fs::create_dir_all(dst).map_err(|e| {
        Error::compression(format!("failed to create directory {}: {}", dst.display(), e))
    })?;

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);

    let mut original = 0u64;
    let mut file_count = 0u64;
    for entry in archive
        .entries()
        .map_err(|e| Error::compression(format!("invalid archive: {}", e)))?
    {
        let mut entry = entry.map_err(|e| Error::compression(format!("invalid entry: {}", e)))?;
        let is_file = entry.header().entry_type().is_file();
        if is_file {
            original += entry.size();
            file_count += 1;
        }
        // unpack_in refuses paths that would escape the destination root
        let unpacked = entry
            .unpack_in(dst)
            .map_err(|e| Error::compression(format!("failed to extract entry: {}", e)))?;
        if !unpacked {
            let path: PathBuf = entry
                .path()
                .map(|p| p.into_owned())
                .unwrap_or_default();
            return Err(Error::compression(format!(
                "archive entry escapes destination root: {}",
                path.display()
            )));
        }
    }

    Ok((original, Some(file_count)))
}

fn destination_size(dst: &Path) -> Result<u64> {
    Ok(std::fs::metadata(dst)
        .map_err(|e| Error::compression(format!("failed to stat {}: {}", dst.display(), e)))?
        .len())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random bytes, diverse enough to be incompressible
    fn noisy_bytes(len: usize) -> Vec<u8> {
        let mut state = 0x2545_f491_4f6c_dd1du64;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state & 0xff) as u8
            })
            .collect()
    }

    fn build_tree(root: &Path) -> u64 {
        std::fs::create_dir_all(root.join("assets")).unwrap();
        let files: [(&str, &[u8]); 3] = [
            ("index.html", b"<html>hello</html>"),
            ("assets/style.css", b"body { margin: 0; }"),
            ("assets/app.js", b"console.log('hi');"),
        ];
        let mut total = 0;
        for (name, content) in files {
            std::fs::write(root.join(name), content).unwrap();
            total += content.len() as u64;
        }
        total
    }

    #[tokio::test]
    async fn test_gzip_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("data.txt");
        let content = b"compress me ".repeat(500);
        std::fs::write(&src, &content).unwrap();

        let compressor = Compressor::default();
        let gz = dir.path().join("data.txt.gz");
        let result = compressor.compress(&src, &gz, None).await.unwrap();
        assert_eq!(result.method, "gzip");
        assert_eq!(result.original_size, content.len() as u64);
        assert!(result.ratio < 1.0); // highly repetitive input

        let restored = dir.path().join("restored.txt");
        let back = compressor.decompress(&gz, &restored, None).await.unwrap();
        assert_eq!(back.original_size, content.len() as u64);
        assert_eq!(std::fs::read(&restored).unwrap(), content);
    }

    #[tokio::test]
    async fn test_zstd_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("data.bin");
        let content = b"zstd zstd zstd ".repeat(300);
        std::fs::write(&src, &content).unwrap();

        let compressor = Compressor::default();
        let zst = dir.path().join("data.bin.zst");
        compressor.compress(&src, &zst, None).await.unwrap();

        let restored = dir.path().join("restored.bin");
        compressor.decompress(&zst, &restored, None).await.unwrap();
        assert_eq!(std::fs::read(&restored).unwrap(), content);
    }

    #[tokio::test]
    async fn test_incompressible_input_ratio_may_exceed_one() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("noise.bin");
        std::fs::write(&src, noisy_bytes(4000)).unwrap();

        let result = Compressor::default()
            .compress(&src, dir.path().join("noise.bin.gz"), None)
            .await
            .unwrap();
        assert!(result.ratio > 0.0);
        assert_eq!(result.original_size, 4000);
    }

    #[tokio::test]
    async fn test_tar_gz_tree_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("site");
        let total = build_tree(&src);

        let compressor = Compressor::default();
        let archive = dir.path().join("site.tar.gz");
        let result = compressor.compress(&src, &archive, None).await.unwrap();
        assert_eq!(result.method, "tar.gz");
        assert_eq!(result.entries, Some(3));
        assert_eq!(result.original_size, total);

        let out = dir.path().join("extracted");
        let back = compressor.decompress(&archive, &out, None).await.unwrap();
        assert_eq!(back.entries, Some(3));
        assert_eq!(back.original_size, total);
        assert_eq!(
            std::fs::read(out.join("index.html")).unwrap(),
            b"<html>hello</html>"
        );
        assert_eq!(
            std::fs::read(out.join("assets").join("app.js")).unwrap(),
            b"console.log('hi');"
        );
    }

    #[tokio::test]
    async fn test_tar_zstd_and_plain_tar() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tree");
        build_tree(&src);

        let compressor = Compressor::default();
        for name in ["tree.tar", "tree.tar.zst"] {
            let archive = dir.path().join(name);
            let result = compressor.compress(&src, &archive, None).await.unwrap();
            assert_eq!(result.entries, Some(3));

            let out = dir.path().join(format!("out-{}", name));
            let back = compressor.decompress(&archive, &out, None).await.unwrap();
            assert_eq!(back.entries, Some(3));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_archive_preserves_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tree");
        std::fs::create_dir_all(&src).unwrap();
        let script = src.join("run.sh");
        std::fs::write(&script, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let compressor = Compressor::default();
        let archive = dir.path().join("tree.tar.gz");
        compressor.compress(&src, &archive, None).await.unwrap();

        let out = dir.path().join("out");
        compressor.decompress(&archive, &out, None).await.unwrap();
        let mode = std::fs::metadata(out.join("run.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[tokio::test]
    async fn test_shape_mismatch_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();

        let compressor = Compressor::default();
        // archive method on a file
        let err = compressor
            .compress(&file, dir.path().join("plain.tar.gz"), None)
            .await;
        assert!(err.is_err());

        // single-file method on a directory
        let err = compressor
            .compress(dir.path(), dir.path().join("dir.gz"), None)
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_stream_errors() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.gz");
        std::fs::write(&bogus, b"this is not a gzip stream at all").unwrap();

        let err = Compressor::default()
            .decompress(&bogus, dir.path().join("out.txt"), None)
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_missing_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = Compressor::default()
            .compress(dir.path().join("nope.txt"), dir.path().join("nope.gz"), None)
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_explicit_format_overrides_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("data.txt");
        let content = b"explicit format".repeat(50);
        std::fs::write(&src, &content).unwrap();

        // Atypical destination name, method passed explicitly
        let compressor = Compressor::default();
        let dst = dir.path().join("data.blob");
        compressor
            .compress(&src, &dst, Some(ArchiveFormat::Zstd))
            .await
            .unwrap();

        let restored = dir.path().join("restored.txt");
        compressor
            .decompress(&dst, &restored, Some(ArchiveFormat::Zstd))
            .await
            .unwrap();
        assert_eq!(std::fs::read(&restored).unwrap(), content);
    }
}
