//! Result type alias for swifthaul operations

/// A specialized `Result` type for swifthaul operations
pub type Result<T> = std::result::Result<T, crate::error::Error>;
