//! depot-core: manifest, lockfile, resolver, and sync engine
//!
//! The core pipeline is manifest -> resolver -> lockfile -> sync:
//!
//! - [`manifest`]: parse and validate `depot.yml`
//! - [`lockfile`]: the hash-pinned `depot.lock`
//! - [`resolver`]: pin a manifest against the remote store
//! - [`sync`]: pull and push against the pinned state
//! - [`archive`]: deterministic zip packing
//! - [`remote`]: the release-based remote store
//! - [`ledger`]: applied-state tracking under `.depot/`

pub mod archive;
pub mod error;
pub mod ledger;
pub mod lockfile;
pub mod manifest;
pub mod remote;
pub mod resolver;
pub mod sync;

pub use archive::{ArchiveService, ZipArchiver};
pub use error::{Error, Result};
pub use ledger::{AppliedAsset, Ledger};
pub use lockfile::{LOCK_FILE, LockedAsset, Lockfile};
pub use manifest::{AssetSpec, MANIFEST_FILE, Manifest};
pub use remote::{GithubStore, Release, RemoteAsset, RemoteError, RemoteStore};
pub use resolver::Resolver;
pub use sync::{
    PullOptions, PullOutcome, PullReport, PushOptions, PushOutcome, PushReport, SyncEngine,
};

use std::path::{Path, PathBuf};

/// Directory for local state (ledger, cache, staging), under the working dir.
pub const DEPOT_DIR: &str = ".depot";

/// The archive cache directory for a working dir.
pub fn cache_dir(working_dir: &Path) -> PathBuf {
    working_dir.join(DEPOT_DIR).join("cache")
}
