//! Parallel multi-digest file hashing for swifthaul
//!
//! This crate computes MD5, SHA-1, and SHA-256 over files in a single
//! streaming pass per file: each read buffer fans out into all three digest
//! states so the file is read from disk exactly once. Batches hash their
//! files in parallel, one task per file, optionally capped by a semaphore.
//!
//! # Examples
//!
//! ```rust,no_run
//! use swifthaul_hash::{HashOptions, Hasher};
//!
//! # async fn example() -> swifthaul_types::Result<()> {
//! let hasher = Hasher::new(HashOptions::default());
//! let batch = hasher.hash_files(&["a.txt".into(), "b.txt".into()]).await?;
//! println!("{} files, {} errors", batch.results.len(), batch.error_count());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithm;
pub mod hasher;

pub use algorithm::HashAlgorithm;
pub use hasher::{HashOptions, Hasher, MultiDigest};
