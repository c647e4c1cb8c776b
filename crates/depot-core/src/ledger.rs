//! Applied-state ledger
//!
//! Records, per asset, the digest and file list that were last applied to
//! the local filesystem. This is what lets `pull` short-circuit when the
//! destination already reflects the lock, and what lets prune distinguish
//! files the system placed from files the user created alongside them.
//!
//! Lives at `.depot/ledger.json`, written atomically.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use depot_fs::{RelPath, write_atomic};
use serde::{Deserialize, Serialize};

use crate::{DEPOT_DIR, Result};

/// Ledger filename under [`DEPOT_DIR`].
pub const LEDGER_FILE: &str = "ledger.json";

/// The state last applied for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAsset {
    pub sha256: String,
    pub files: Vec<RelPath>,
}

/// Per-asset applied state, keyed by asset name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub assets: BTreeMap<String, AppliedAsset>,
}

impl Ledger {
    /// The ledger path for a working directory.
    pub fn path_for(working_dir: &Path) -> PathBuf {
        working_dir.join(DEPOT_DIR).join(LEDGER_FILE)
    }

    /// Load the ledger, or an empty one if none has been written yet.
    ///
    /// An unreadable ledger is treated as empty: the worst case is a
    /// redundant re-pull, which the digest check keeps correct.
    pub fn load(working_dir: &Path) -> Self {
        let path = Self::path_for(working_dir);
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Persist atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, working_dir: &Path) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        write_atomic(&Self::path_for(working_dir), content.as_bytes())?;
        Ok(())
    }

    /// The applied record for an asset, if any.
    pub fn get(&self, name: &str) -> Option<&AppliedAsset> {
        self.assets.get(name)
    }

    /// Record the state just applied for an asset.
    pub fn record(&mut self, name: impl Into<String>, sha256: impl Into<String>, files: Vec<RelPath>) {
        self.assets.insert(
            name.into(),
            AppliedAsset {
                sha256: sha256.into(),
                files,
            },
        );
    }

    /// Whether `name` is already applied at `sha256`.
    pub fn is_applied(&self, name: &str, sha256: &str) -> bool {
        self.get(name).is_some_and(|a| a.sha256 == sha256)
    }
}
