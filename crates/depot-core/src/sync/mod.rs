//! Sync engine: pull and push against the pinned lockfile
//!
//! The engine owns the working directory and its `.depot/` state, a remote
//! store handle, and an archiver. Per-asset work runs on a bounded worker
//! pool; assets are independent, so one failure is reported rather than
//! aborting the rest.

mod pull;
mod push;
mod report;

pub use report::{AssetReport, PullOutcome, PullReport, PushOutcome, PushReport};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use depot_fs::ArchiveCache;

use crate::archive::ArchiveService;
use crate::remote::{Release, RemoteError, RemoteStore};
use crate::{Error, Result, cache_dir};

/// Options for a pull run.
#[derive(Debug, Clone)]
pub struct PullOptions {
    /// Re-fetch and re-extract even when the ledger says up to date.
    pub force: bool,
    /// Delete previously-managed files absent from the new member list.
    pub prune: bool,
    /// Worker pool size.
    pub jobs: usize,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            force: false,
            prune: true,
            jobs: DEFAULT_JOBS,
        }
    }
}

/// Options for a push run.
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Report what would change without any remote calls.
    pub dry_run: bool,
    /// Overwrite existing remote objects.
    pub force: bool,
    /// Worker pool size.
    pub jobs: usize,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            force: false,
            jobs: DEFAULT_JOBS,
        }
    }
}

pub const DEFAULT_JOBS: usize = 4;

/// Coordinates the remote store, archive cache, and working directory.
pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    archiver: Arc<dyn ArchiveService>,
    working_dir: PathBuf,
    cache: ArchiveCache,
    cancel: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        archiver: Arc<dyn ArchiveService>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        let working_dir = working_dir.into();
        let cache = ArchiveCache::new(cache_dir(&working_dir));
        Self {
            remote,
            archiver,
            working_dir,
            cache,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The flag that stops new asset work from being scheduled.
    ///
    /// Shared so a signal handler can flip it; in-flight extraction still
    /// completes into its staging directory.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn pool(&self, jobs: usize) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build()
            .map_err(|e| Error::Pool {
                message: e.to_string(),
            })
    }
}

/// Fetch-once wrapper around the release lookup.
///
/// Push only needs the release when an asset actually uploads; keeping the
/// lookup lazy means an all-unchanged push makes zero remote calls.
struct LazyRelease<'a> {
    remote: &'a dyn RemoteStore,
    repository: &'a str,
    tag: &'a str,
    slot: Mutex<Option<Release>>,
}

impl<'a> LazyRelease<'a> {
    fn new(remote: &'a dyn RemoteStore, repository: &'a str, tag: &'a str) -> Self {
        Self {
            remote,
            repository,
            tag,
            slot: Mutex::new(None),
        }
    }

    /// The release, created on the remote if absent, fetched at most once.
    fn get(&self) -> std::result::Result<Release, RemoteError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| RemoteError::transport("release lookup poisoned by panic"))?;
        if let Some(release) = slot.as_ref() {
            return Ok(release.clone());
        }
        let release = self.remote.ensure_release(self.repository, self.tag)?;
        *slot = Some(release.clone());
        Ok(release)
    }
}
