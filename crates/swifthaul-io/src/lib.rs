//! Streaming copy engine for swifthaul
//!
//! Copies stream bytes from source to destination while a SHA-256 state is
//! updated from the same write buffer, so the integrity digest costs no
//! second read. Single-file copies preserve permission bits and timestamps
//! and fsync the destination; directory copies mirror the tree structure
//! serially, then copy regular files in parallel.
//!
//! # Examples
//!
//! ```rust,no_run
//! use swifthaul_io::{Copier, CopyOptions};
//!
//! # async fn example() -> swifthaul_types::Result<()> {
//! let copier = Copier::new(CopyOptions::default());
//! let result = copier.copy_file("src.bin", "dst.bin").await?;
//! println!("{} bytes, sha256 {}", result.bytes_copied, result.sha256);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod copy;
pub mod tree;

pub use copy::{Copier, CopyOptions};
