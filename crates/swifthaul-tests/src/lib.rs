//! Shared utilities for swifthaul integration tests
//!
//! Deterministic data generators and fixture builders used by the
//! cross-component tests in `tests/`.

#![warn(missing_docs)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Test data generation patterns
#[derive(Debug, Clone, Copy)]
pub enum TestDataPattern {
    /// All zeros - highly compressible
    Zeros,
    /// Deterministic pseudo-random bytes - effectively incompressible
    Random,
    /// Repeated text - compressible, realistic
    Text,
}

/// Generate deterministic test data with the given pattern
pub fn generate_test_data(size: usize, pattern: TestDataPattern) -> Vec<u8> {
    match pattern {
        TestDataPattern::Zeros => vec![0u8; size],
        TestDataPattern::Random => {
            // xorshift for reproducible incompressible bytes
            let mut state = 0x9e37_79b9_7f4a_7c15u64;
            (0..size)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state & 0xff) as u8
                })
                .collect()
        }
        TestDataPattern::Text => b"the quick brown fox jumps over the lazy dog\n"
            .iter()
            .copied()
            .cycle()
            .take(size)
            .collect(),
    }
}

/// Write a file with the given pattern, creating parent directories
pub fn write_test_file(path: &Path, size: usize, pattern: TestDataPattern) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, generate_test_data(size, pattern))
}

/// Build a 3-file, 1-subdirectory tree and return (paths, total bytes)
pub fn build_sample_tree(root: &Path) -> io::Result<(Vec<PathBuf>, u64)> {
    let files = [
        ("report.txt", 1500, TestDataPattern::Text),
        ("data.bin", 900, TestDataPattern::Random),
        ("nested/notes.txt", 600, TestDataPattern::Text),
    ];
    let mut paths = Vec::new();
    let mut total = 0u64;
    for (name, size, pattern) in files {
        let path = root.join(name);
        write_test_file(&path, size, pattern)?;
        total += size as u64;
        paths.push(path);
    }
    Ok((paths, total))
}
