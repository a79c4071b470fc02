//! Archive format selection

use std::fmt;
use std::path::Path;
use swifthaul_types::{Error, Result};

/// Supported compression and archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// gzip, single file
    Gzip,
    /// zstd, single file
    Zstd,
    /// Uncompressed tar archive of a directory tree
    Tar,
    /// tar archive compressed with gzip
    TarGzip,
    /// tar archive compressed with zstd
    TarZstd,
}

impl ArchiveFormat {
    /// Infer the format from a filename's suffix
    ///
    /// `.tar.gz`/`.tgz` and `.tar.zst` are checked before the bare `.gz` and
    /// `.zst` suffixes. An unrecognized suffix is an input error.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let name = path
            .as_ref()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGzip)
        } else if name.ends_with(".tar.zst") {
            Ok(Self::TarZstd)
        } else if name.ends_with(".tar") {
            Ok(Self::Tar)
        } else if name.ends_with(".gz") {
            Ok(Self::Gzip)
        } else if name.ends_with(".zst") {
            Ok(Self::Zstd)
        } else {
            Err(Error::unsupported_format(name))
        }
    }

    /// Whether this format archives a directory tree
    pub fn is_archive(self) -> bool {
        matches!(self, Self::Tar | Self::TarGzip | Self::TarZstd)
    }
}

impl std::str::FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Self::Gzip),
            "zstd" | "zst" => Ok(Self::Zstd),
            "tar" => Ok(Self::Tar),
            "tar.gz" | "targz" | "tgz" => Ok(Self::TarGzip),
            "tar.zst" | "tarzst" => Ok(Self::TarZstd),
            other => Err(Error::unsupported_format(other)),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gzip => write!(f, "gzip"),
            Self::Zstd => write!(f, "zstd"),
            Self::Tar => write!(f, "tar"),
            Self::TarGzip => write!(f, "tar.gz"),
            Self::TarZstd => write!(f, "tar.zst"),
        }
    }
}
