//! Core type system and error handling for the swifthaul performance engine
//!
//! This crate provides the foundational types shared across the swifthaul
//! workspace. It includes:
//!
//! - **Error handling**: Structured error types with kinds and retriability
//! - **Result types**: Every cross-boundary result object (checksums, copies,
//!   compression, probes, transfers, system snapshots, metrics)
//!
//! Every result type is created fresh per operation, handed to the caller,
//! and has no further lifecycle. All of them serialize with serde so the
//! migration orchestrator can consume them across a process boundary.
//!
//! # Examples
//!
//! ```rust
//! use swifthaul_types::{ChecksumResult, Error, Result};
//!
//! fn example() -> Result<ChecksumResult> {
//!     Ok(ChecksumResult::failed("missing.txt", "file not found"))
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use result::Result;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_result_failed() {
        let result = ChecksumResult::failed("missing.txt", "file not found");
        assert!(result.md5.is_empty());
        assert!(result.sha256.is_empty());
        assert_eq!(result.error.as_deref(), Some("file not found"));
    }

    #[test]
    fn test_error_kind() {
        let err = Error::network("connection refused");
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retriable());

        let err = Error::unsupported_algorithm("crc7");
        assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm);
        assert!(!err.is_retriable());
    }
}
