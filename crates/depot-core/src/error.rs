//! Error types for depot-core

use std::path::PathBuf;

use crate::remote::RemoteError;

/// Result type for depot-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in depot-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed manifest: missing fields, duplicate assets, overlapping
    /// destinations. Always raised before any I/O is attempted.
    #[error("Invalid manifest: {message}")]
    Validation { message: String },

    /// Manifest file not found at expected path
    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    /// Lockfile not found; `depot resolve` creates it
    #[error("Lockfile not found: {path}. Run 'depot resolve' first.")]
    LockfileNotFound { path: PathBuf },

    /// Lockfile exists but cannot be parsed
    #[error("Corrupted lockfile: {message}")]
    LockfileCorrupted { message: String },

    /// The release exists but carries no object for a declared asset
    #[error("Asset '{name}' not found in release {version}")]
    AssetNotFound { name: String, version: String },

    /// Downloaded bytes do not hash to the lockfile's pinned digest
    #[error("Digest mismatch for '{name}': expected {expected}, got {actual}")]
    Integrity {
        name: String,
        expected: String,
        actual: String,
    },

    /// Archive entry would escape the destination directory
    #[error("Unsafe archive entry path: {path}")]
    UnsafePath { path: String },

    /// Archive bytes are malformed
    #[error("Corrupt archive: {message}")]
    CorruptArchive { message: String },

    /// An exclude glob in the manifest does not parse
    #[error("Invalid exclude pattern '{pattern}': {message}")]
    ExcludePattern { pattern: String, message: String },

    /// Worker pool construction failed
    #[error("Failed to build worker pool: {message}")]
    Pool { message: String },

    /// Remote store error (not found, conflict, transport)
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Filesystem error from depot-fs
    #[error(transparent)]
    Fs(#[from] depot_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
