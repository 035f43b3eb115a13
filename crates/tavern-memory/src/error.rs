//! Error types for the memory store.
//!
//! In-memory operations cannot fail; only snapshot persistence produces a
//! [`MemoryError`].

use std::path::PathBuf;

/// Errors that can occur while persisting or restoring memory state.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Reading or writing a snapshot file failed.
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot could not be encoded or decoded.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No snapshot exists under the requested namespace.
    #[error("no snapshot found at {0}")]
    SnapshotNotFound(PathBuf),

    /// The namespace contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid snapshot namespace: {0:?}")]
    InvalidNamespace(String),

    /// The snapshot was written by an incompatible format version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },
}
