//! Lockfile model for depot.lock
//!
//! The lockfile pins exactly what was last resolved: per asset a download
//! URL, the packed archive's SHA-256, and the archive's member list. Assets
//! are stored as an array in manifest declaration order so serialization is
//! deterministic; re-resolving with unchanged inputs yields byte-identical
//! output.

use std::path::Path;

use depot_fs::{RelPath, write_atomic};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default lockfile filename.
pub const LOCK_FILE: &str = "depot.lock";

/// One resolved asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedAsset {
    pub name: String,
    pub download_url: String,
    /// SHA-256 of the packed archive, lowercase hex.
    pub sha256: String,
    /// Archive members, relative forward-slash paths in archive order.
    pub files: Vec<RelPath>,
}

/// Resolved, hash-pinned state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    pub repository: String,
    pub version: String,
    pub assets: Vec<LockedAsset>,
}

impl Lockfile {
    /// Load a lockfile.
    ///
    /// # Errors
    ///
    /// [`Error::LockfileNotFound`] if absent, [`Error::LockfileCorrupted`]
    /// if unparseable.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::LockfileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| depot_fs::Error::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| Error::LockfileCorrupted {
            message: e.to_string(),
        })
    }

    /// Serialize to the canonical on-disk form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Write atomically (temp-then-rename), never leaving a partial file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_json()?;
        write_atomic(path, content.as_bytes())?;
        Ok(())
    }

    /// Look up an asset by name.
    pub fn get(&self, name: &str) -> Option<&LockedAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}
