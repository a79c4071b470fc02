//! Error types and handling for swifthaul
//!
//! Component functions return an explicit [`Error`] alongside or instead of a
//! result object; the orchestrator decides whether to retry, skip, or abort
//! the surrounding migration step. The engine itself performs no retries
//! except the bounded retry in the HTTP transfer path.

use std::path::PathBuf;

/// Main error type for swifthaul operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found
        path: PathBuf,
    },

    /// Hashing error
    #[error("Hash error: {message}")]
    Hash {
        /// Error message describing the hashing issue
        message: String,
    },

    /// Copy error
    #[error("Copy error: {message}")]
    Copy {
        /// Error message describing the copy issue
        message: String,
    },

    /// Compression or archive error
    #[error("Compression error: {message}")]
    Compression {
        /// Error message describing the compression issue
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// DNS resolution error
    #[error("DNS error: {message}")]
    Dns {
        /// Error message describing the DNS issue
        message: String,
    },

    /// HTTP transfer error
    #[error("HTTP error: {message}")]
    Http {
        /// Error message describing the HTTP issue
        message: String,
    },

    /// Resource monitoring error
    #[error("Monitor error: {message}")]
    Monitor {
        /// Error message describing the monitoring issue
        message: String,
    },

    /// Unsupported hash algorithm name
    #[error("Unsupported hash algorithm: {name}")]
    UnsupportedAlgorithm {
        /// The algorithm name that was requested
        name: String,
    },

    /// Unsupported or unrecognized compression format
    #[error("Unsupported compression format: {name}")]
    UnsupportedFormat {
        /// The format name or file suffix that was requested
        name: String,
    },

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Operation timed out
    #[error("Operation timed out after {seconds} seconds")]
    Timeout {
        /// Number of seconds after which the operation timed out
        seconds: u64,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// Hashing errors
    Hash,
    /// Copy errors
    Copy,
    /// Compression errors
    Compression,
    /// Network errors
    Network,
    /// DNS errors
    Dns,
    /// HTTP errors
    Http,
    /// Monitoring errors
    Monitor,
    /// Unsupported algorithm
    UnsupportedAlgorithm,
    /// Unsupported format
    UnsupportedFormat,
    /// Cancellation
    Cancelled,
    /// Timeout
    Timeout,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::FileNotFound { .. } => ErrorKind::Io,
            Self::Hash { .. } => ErrorKind::Hash,
            Self::Copy { .. } => ErrorKind::Copy,
            Self::Compression { .. } => ErrorKind::Compression,
            Self::Network { .. } => ErrorKind::Network,
            Self::Dns { .. } => ErrorKind::Dns,
            Self::Http { .. } => ErrorKind::Http,
            Self::Monitor { .. } => ErrorKind::Monitor,
            Self::UnsupportedAlgorithm { .. } => ErrorKind::UnsupportedAlgorithm,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Check if a caller-side retry is worthwhile for this error
    ///
    /// Input errors (missing files, unsupported names) never are; transient
    /// network, DNS, HTTP, and timeout failures are.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Dns { .. } | Self::Http { .. } | Self::Timeout { .. }
        )
    }

    /// Create a new hash error
    pub fn hash<S: Into<String>>(message: S) -> Self {
        Self::Hash {
            message: message.into(),
        }
    }

    /// Create a new copy error
    pub fn copy<S: Into<String>>(message: S) -> Self {
        Self::Copy {
            message: message.into(),
        }
    }

    /// Create a new compression error
    pub fn compression<S: Into<String>>(message: S) -> Self {
        Self::Compression {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new DNS error
    pub fn dns<S: Into<String>>(message: S) -> Self {
        Self::Dns {
            message: message.into(),
        }
    }

    /// Create a new HTTP error
    pub fn http<S: Into<String>>(message: S) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Create a new monitoring error
    pub fn monitor<S: Into<String>>(message: S) -> Self {
        Self::Monitor {
            message: message.into(),
        }
    }

    /// Create a new unsupported-algorithm error
    pub fn unsupported_algorithm<S: Into<String>>(name: S) -> Self {
        Self::UnsupportedAlgorithm { name: name.into() }
    }

    /// Create a new unsupported-format error
    pub fn unsupported_format<S: Into<String>>(name: S) -> Self {
        Self::UnsupportedFormat { name: name.into() }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
