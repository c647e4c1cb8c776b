//! Push: publish local source trees as release objects
//!
//! Per asset: pack the source deterministically, compare the digest with the
//! lock entry, and upload only what changed. The release lookup is lazy and
//! shared, so a fully unchanged push (and any dry run) makes no remote calls
//! at all.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::lockfile::{LOCK_FILE, LockedAsset, Lockfile};
use crate::manifest::{AssetSpec, Manifest};
use crate::remote::RemoteError;
use crate::{Error, Result};

use super::report::{PushOutcome, PushReport};
use super::{LazyRelease, PushOptions, SyncEngine};

impl SyncEngine {
    /// Push every manifest asset whose packed digest differs from the lock.
    ///
    /// Successful uploads update `lockfile` in place; it is persisted to
    /// `depot.lock` in the working directory only when something changed and
    /// the run was not dry.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures (worker pool, lockfile write) abort the
    /// run; per-asset errors land in the report.
    pub fn push(
        &self,
        manifest: &Manifest,
        lockfile: &mut Lockfile,
        options: &PushOptions,
    ) -> Result<PushReport> {
        let release = LazyRelease::new(
            self.remote.as_ref(),
            &manifest.repository,
            &manifest.version,
        );

        // Lock entries pin a specific release; when the manifest targets a
        // different one, every asset must upload regardless of digests.
        let baseline: Option<&Lockfile> = (lockfile.repository == manifest.repository
            && lockfile.version == manifest.version)
            .then_some(&*lockfile);

        let pool = self.pool(options.jobs)?;
        let results: Vec<(String, PushOutcome, Option<LockedAsset>)> = pool.install(|| {
            manifest
                .assets
                .par_iter()
                .map(|spec| {
                    let name = spec.name.clone();
                    if self.cancelled() {
                        return (
                            name,
                            PushOutcome::Failed {
                                reason: "cancelled".to_string(),
                            },
                            None,
                        );
                    }
                    match self.push_asset(spec, baseline, options, &release) {
                        Ok((outcome, entry)) => (name, outcome, entry),
                        Err(e) => {
                            warn!(asset = %spec.name, error = %e, "push failed");
                            (
                                name,
                                PushOutcome::Failed {
                                    reason: e.to_string(),
                                },
                                None,
                            )
                        }
                    }
                })
                .collect()
        });

        let original = lockfile.clone();
        lockfile.repository = manifest.repository.clone();
        lockfile.version = manifest.version.clone();
        for (name, _, entry) in &results {
            if let Some(entry) = entry {
                match lockfile.assets.iter_mut().find(|a| a.name == *name) {
                    Some(existing) => *existing = entry.clone(),
                    None => lockfile.assets.push(entry.clone()),
                }
            }
        }
        sort_to_manifest_order(lockfile, manifest);

        if *lockfile != original && !options.dry_run {
            lockfile.save(&self.working_dir().join(LOCK_FILE))?;
        }

        let report =
            PushReport::from_outcomes(results.into_iter().map(|(n, o, _)| (n, o)).collect());
        info!(
            assets = report.assets.len(),
            success = report.success(),
            dry_run = options.dry_run,
            "push finished"
        );
        Ok(report)
    }

    fn push_asset(
        &self,
        spec: &AssetSpec,
        baseline: Option<&Lockfile>,
        options: &PushOptions,
        release: &LazyRelease<'_>,
    ) -> Result<(PushOutcome, Option<LockedAsset>)> {
        let source = spec.source.to_native(self.working_dir());
        if !source.is_dir() {
            return Err(Error::validation(format!(
                "source directory for '{}' not found: {}",
                spec.name,
                source.display()
            )));
        }

        let (bytes, sha256) = self.archiver.pack(&source, &spec.excludes)?;
        let files = self.archiver.list_members(&bytes)?;
        let existing = baseline.and_then(|l| l.get(&spec.name));

        if !options.force && existing.is_some_and(|e| e.sha256 == sha256) {
            debug!(asset = %spec.name, "unchanged");
            return Ok((PushOutcome::Unchanged, None));
        }

        if options.dry_run {
            return Ok((
                PushOutcome::WouldPush {
                    old_sha256: existing.map(|e| e.sha256.clone()),
                    new_sha256: sha256,
                    files: files.len(),
                },
                None,
            ));
        }

        let release = release.get()?;
        let object_name = format!("{}.zip", spec.name);
        match self
            .remote
            .upload_asset(&release, &object_name, &bytes, options.force)
        {
            Ok(uploaded) => {
                self.cache.store(&sha256, &bytes)?;
                info!(asset = %spec.name, digest = %sha256, files = files.len(), "pushed");
                Ok((
                    PushOutcome::Pushed {
                        sha256: sha256.clone(),
                        files: files.len(),
                    },
                    Some(LockedAsset {
                        name: spec.name.clone(),
                        download_url: uploaded.download_url,
                        sha256,
                        files,
                    }),
                ))
            }
            Err(RemoteError::Conflict { .. }) => {
                warn!(asset = %spec.name, "remote object exists, skipped");
                Ok((PushOutcome::SkippedConflict, None))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Reorder lock entries to manifest order; entries for assets no longer in
/// the manifest keep their relative order at the end.
fn sort_to_manifest_order(lockfile: &mut Lockfile, manifest: &Manifest) {
    let position = |name: &str| {
        manifest
            .assets
            .iter()
            .position(|a| a.name == name)
            .unwrap_or(usize::MAX)
    };
    lockfile.assets.sort_by_key(|a| position(&a.name));
}
