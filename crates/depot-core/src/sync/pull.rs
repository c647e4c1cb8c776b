//! Pull: apply the lockfile's pinned state to the working directory
//!
//! Per asset: skip if the ledger already shows the pinned digest applied,
//! otherwise fetch (cache first), verify the digest, extract into a staging
//! directory under `.depot/`, move files into the destination, and prune
//! previously-managed files that the new member list no longer carries.
//! Files the engine never placed are never touched.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use depot_fs::digest_bytes;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::ledger::{AppliedAsset, Ledger};
use crate::lockfile::{Lockfile, LockedAsset};
use crate::manifest::Manifest;
use crate::{DEPOT_DIR, Error, Result};

use super::report::{PullOutcome, PullReport};
use super::{PullOptions, SyncEngine};

impl SyncEngine {
    /// Pull every locked asset into its destination.
    ///
    /// Assets are independent: one failure becomes a `Failed` outcome in
    /// the report and the rest proceed. The ledger is updated for each
    /// successfully applied asset and persisted once at the end.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures (worker pool, staging root, ledger
    /// write) abort the run; per-asset errors land in the report.
    pub fn pull(
        &self,
        manifest: &Manifest,
        lockfile: &Lockfile,
        options: &PullOptions,
    ) -> Result<PullReport> {
        let ledger = Ledger::load(&self.working_dir);
        let staging_root = self.working_dir.join(DEPOT_DIR).join("staging");
        fs::create_dir_all(&staging_root).map_err(|e| depot_fs::Error::io(&staging_root, e))?;

        let pool = self.pool(options.jobs)?;
        let results: Vec<(String, PullOutcome, Option<AppliedAsset>)> = pool.install(|| {
            lockfile
                .assets
                .par_iter()
                .map(|locked| {
                    let name = locked.name.clone();
                    if self.cancelled() {
                        return (
                            name,
                            PullOutcome::Failed {
                                reason: "cancelled".to_string(),
                            },
                            None,
                        );
                    }
                    match self.pull_asset(manifest, locked, &ledger, options, &staging_root) {
                        Ok((outcome, applied)) => (name, outcome, applied),
                        Err(e) => {
                            warn!(asset = %locked.name, error = %e, "pull failed");
                            (
                                name,
                                PullOutcome::Failed {
                                    reason: e.to_string(),
                                },
                                None,
                            )
                        }
                    }
                })
                .collect()
        });

        let mut ledger = ledger;
        let mut ledger_changed = false;
        for (name, _, applied) in &results {
            if let Some(applied) = applied {
                ledger.record(name.clone(), applied.sha256.clone(), applied.files.clone());
                ledger_changed = true;
            }
        }
        if ledger_changed {
            ledger.save(&self.working_dir)?;
        }

        let report =
            PullReport::from_outcomes(results.into_iter().map(|(n, o, _)| (n, o)).collect());
        info!(
            assets = report.assets.len(),
            success = report.success(),
            "pull finished"
        );
        Ok(report)
    }

    fn pull_asset(
        &self,
        manifest: &Manifest,
        locked: &LockedAsset,
        ledger: &Ledger,
        options: &PullOptions,
        staging_root: &Path,
    ) -> Result<(PullOutcome, Option<AppliedAsset>)> {
        let spec = manifest.get(&locked.name).ok_or_else(|| {
            Error::validation(format!(
                "asset '{}' is locked but not declared in the manifest",
                locked.name
            ))
        })?;

        // The ledger alone is not enough to skip: a user may have deleted a
        // pulled file since, so every recorded file must still be on disk.
        let destination = spec.destination.to_native(&self.working_dir);
        if !options.force
            && ledger.is_applied(&locked.name, &locked.sha256)
            && all_files_present(ledger.get(&locked.name), &destination)
        {
            debug!(asset = %locked.name, "up to date");
            return Ok((PullOutcome::UpToDate, None));
        }
        if options.force {
            self.cache.invalidate(&locked.sha256)?;
        }

        let bytes = self.fetch_verified(locked)?;

        // Extract into a fresh staging dir, then move files into place.
        // A failure mid-extraction leaves the destination untouched.
        let staging =
            tempfile::tempdir_in(staging_root).map_err(|e| depot_fs::Error::io(staging_root, e))?;
        let files = self.archiver.unpack(&bytes, staging.path())?;

        for rel in &files {
            let from = rel.to_native(staging.path());
            let to = rel.to_native(&destination);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(|e| depot_fs::Error::io(parent, e))?;
            }
            replace_file(&from, &to)?;
        }

        let mut pruned = 0;
        if options.prune
            && let Some(previous) = ledger.get(&locked.name)
        {
            let current: BTreeSet<_> = files.iter().collect();
            for stale in previous.files.iter().filter(|f| !current.contains(f)) {
                let path = stale.to_native(&destination);
                match fs::remove_file(&path) {
                    Ok(()) => {
                        debug!(asset = %locked.name, file = %stale, "pruned");
                        pruned += 1;
                        remove_empty_parents(&path, &destination);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(depot_fs::Error::io(&path, e).into()),
                }
            }
        }

        info!(asset = %locked.name, files = files.len(), pruned, "pulled");
        Ok((
            PullOutcome::Pulled {
                files: files.len(),
                pruned,
            },
            Some(AppliedAsset {
                sha256: locked.sha256.clone(),
                files,
            }),
        ))
    }

    /// Archive bytes for a lock entry, from cache or the remote, verified
    /// against the pinned digest. Bytes that fail verification are never
    /// cached.
    fn fetch_verified(&self, locked: &LockedAsset) -> Result<Vec<u8>> {
        if let Some(bytes) = self.cache.read(&locked.sha256)? {
            debug!(asset = %locked.name, "cache hit");
            return Ok(bytes);
        }
        let bytes = self.remote.download_asset(&locked.download_url)?;
        let actual = digest_bytes(&bytes);
        if actual != locked.sha256 {
            return Err(Error::Integrity {
                name: locked.name.clone(),
                expected: locked.sha256.clone(),
                actual,
            });
        }
        self.cache.store(&locked.sha256, &bytes)?;
        Ok(bytes)
    }
}

/// Whether every file the ledger recorded for an asset still exists under
/// its destination.
fn all_files_present(applied: Option<&AppliedAsset>, destination: &Path) -> bool {
    applied.is_some_and(|a| a.files.iter().all(|f| f.to_native(destination).is_file()))
}

fn replace_file(from: &Path, to: &Path) -> Result<()> {
    match fs::remove_file(to) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(depot_fs::Error::io(to, e).into()),
    }
    fs::rename(from, to).map_err(|e| depot_fs::Error::io(to, e))?;
    Ok(())
}

/// Remove directories left empty by pruning, up to (not including) `root`.
fn remove_empty_parents(path: &Path, root: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root || fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}
