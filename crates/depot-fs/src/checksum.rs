//! SHA-256 digests
//!
//! Lockfile entries, cache keys, and the applied-state ledger all use the
//! same digest format: lowercase hex, no prefix.

use sha2::{Digest, Sha256};

/// Digest a byte slice.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
