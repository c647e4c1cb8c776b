//! Normalized relative paths
//!
//! Archive members, lockfile `files` entries, and ledger records all use
//! forward-slash relative paths so that digests and serialized state are
//! identical across platforms. [`RelPath`] enforces that invariant at
//! construction: no absolute paths, no `..` components, no empty segments.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserialize, Deserializer};
use serde::{Serialize, Serializer};

use crate::{Error, Result};

/// A clean, forward-slash relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath {
    inner: String,
}

impl RelPath {
    /// Create a `RelPath`, normalizing backslashes to forward slashes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafePath`] if the path is absolute, empty, or
    /// contains `.`/`..` components. This is the traversal guard used when
    /// unpacking archives and when reading untrusted lockfiles.
    pub fn new(path: impl AsRef<str>) -> Result<Self> {
        let normalized = path.as_ref().replace('\\', "/");

        if normalized.is_empty()
            || normalized.starts_with('/')
            || has_windows_prefix(&normalized)
        {
            return Err(Error::UnsafePath { path: normalized });
        }

        let clean = normalized
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
        if !clean {
            return Err(Error::UnsafePath { path: normalized });
        }

        Ok(Self { inner: normalized })
    }

    /// Build from a native path relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafePath`] if `path` is not under `root` or is not
    /// valid UTF-8.
    pub fn from_native(root: &Path, path: &Path) -> Result<Self> {
        let rel = path.strip_prefix(root).map_err(|_| Error::UnsafePath {
            path: path.display().to_string(),
        })?;
        let rel = rel.to_str().ok_or_else(|| Error::UnsafePath {
            path: path.display().to_string(),
        })?;
        Self::new(rel)
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native path rooted at `base`.
    pub fn to_native(&self, base: &Path) -> PathBuf {
        let mut out = base.to_path_buf();
        for seg in self.inner.split('/') {
            out.push(seg);
        }
        out
    }

    /// The final path segment.
    pub fn file_name(&self) -> &str {
        self.inner.rsplit('/').next().unwrap_or(&self.inner)
    }
}

/// Detect `C:` style prefixes so Windows-absolute paths are rejected even
/// when parsing on other platforms.
fn has_windows_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl Serialize for RelPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

impl<'de> Deserialize<'de> for RelPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RelPath::new(&raw).map_err(|_| de::Error::custom(format!("unsafe path: {raw}")))
    }
}
