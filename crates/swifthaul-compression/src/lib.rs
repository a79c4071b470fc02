//! Compression engine for swifthaul
//!
//! Compresses and decompresses single files (gzip, zstd) and whole directory
//! trees (tar, tar+gzip, tar+zstd). Archives are self-describing standard
//! formats readable by any compliant tool. The method is an explicit
//! [`ArchiveFormat`] parameter; when the caller does not supply one it is
//! inferred from the relevant filename's suffix so round-tripping by name
//! still works.
//!
//! All stream work is synchronous I/O executed under
//! `tokio::task::spawn_blocking`, since compression is CPU-bound.
//!
//! # Examples
//!
//! ```rust,no_run
//! use swifthaul_compression::{CompressionOptions, Compressor};
//!
//! # async fn example() -> swifthaul_types::Result<()> {
//! let compressor = Compressor::new(CompressionOptions::default());
//! let result = compressor.compress("site/", "site.tar.gz", None).await?;
//! println!("ratio {:.3}", result.ratio);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod format;

pub use engine::{CompressionOptions, Compressor};
pub use format::ArchiveFormat;
