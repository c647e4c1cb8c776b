//! Content-addressed archive cache
//!
//! Downloaded and freshly packed archives are stored under
//! `.depot/cache/<sha256>.zip`. Entries are immutable: a digest never maps to
//! two different contents. Reads re-verify the digest and discard the entry
//! on mismatch, so a corrupted cache degrades to a re-fetch rather than a
//! wrong extraction. Writers stage to a temp file and atomically rename, so
//! concurrent readers never observe partial content.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::checksum::digest_bytes;
use crate::io::write_atomic;
use crate::{Error, Result};

/// Content-addressed store for archive bytes, keyed by SHA-256 hex digest.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    root: PathBuf,
}

impl ArchiveCache {
    /// Create a cache rooted at `root`. The directory is created lazily on
    /// first store.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The on-disk path for a digest.
    pub fn entry_path(&self, sha256: &str) -> PathBuf {
        self.root.join(format!("{sha256}.zip"))
    }

    /// Read the entry for `sha256`, verifying its digest.
    ///
    /// Returns `Ok(None)` when the entry is absent. An entry whose contents
    /// no longer hash to its key is deleted and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures other than a missing entry.
    pub fn read(&self, sha256: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(sha256);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(&path, e)),
        };

        if digest_bytes(&bytes) != sha256 {
            warn!(digest = sha256, "cache entry failed verification, discarding");
            self.invalidate(sha256)?;
            return Ok(None);
        }

        debug!(digest = sha256, "cache hit");
        Ok(Some(bytes))
    }

    /// Store `bytes` under `sha256`.
    ///
    /// Existing entries are left untouched: content-addressed entries are
    /// immutable, so an entry that already exists is already correct (or will
    /// be caught by verification on the next read).
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn store(&self, sha256: &str, bytes: &[u8]) -> Result<()> {
        let path = self.entry_path(sha256);
        if path.exists() {
            return Ok(());
        }
        debug!(digest = sha256, size = bytes.len(), "caching archive");
        write_atomic(&path, bytes)
    }

    /// Remove the entry for `sha256` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be removed.
    pub fn invalidate(&self, sha256: &str) -> Result<()> {
        let path = self.entry_path(sha256);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&path, e)),
        }
    }
}
