//! Resolver: pin a manifest against the remote store
//!
//! Resolution turns declared intent into exact state: for each asset in the
//! manifest, find the `<name>.zip` object in the `(repository, version)`
//! release and record its download URL, digest, and member list. The result
//! is a lockfile in manifest order. Resolution never touches source or
//! destination directories; it does warm the archive cache so the pull that
//! usually follows is free of downloads.

use std::sync::Arc;

use depot_fs::{ArchiveCache, digest_bytes};
use tracing::{debug, info, warn};

use crate::archive::ArchiveService;
use crate::lockfile::{LockedAsset, Lockfile};
use crate::manifest::Manifest;
use crate::remote::RemoteStore;
use crate::{Error, Result};

pub struct Resolver {
    remote: Arc<dyn RemoteStore>,
    archiver: Arc<dyn ArchiveService>,
    cache: ArchiveCache,
}

impl Resolver {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        archiver: Arc<dyn ArchiveService>,
        cache: ArchiveCache,
    ) -> Self {
        Self {
            remote,
            archiver,
            cache,
        }
    }

    /// Resolve every manifest asset into a pinned lock entry.
    ///
    /// All-or-nothing: a missing release or missing per-asset object fails
    /// the whole resolve, so a returned lockfile is always internally
    /// consistent.
    ///
    /// # Errors
    ///
    /// [`Error::Remote`] if the release is absent, [`Error::AssetNotFound`]
    /// for a declared asset with no remote object.
    pub fn resolve(&self, manifest: &Manifest) -> Result<Lockfile> {
        let release = self
            .remote
            .get_release(&manifest.repository, &manifest.version)?;

        let mut assets = Vec::with_capacity(manifest.assets.len());
        for spec in &manifest.assets {
            let object_name = format!("{}.zip", spec.name);
            let remote_asset =
                release
                    .asset(&object_name)
                    .ok_or_else(|| Error::AssetNotFound {
                        name: spec.name.clone(),
                        version: manifest.version.clone(),
                    })?;

            // A store-reported digest lets a warm cache skip the download
            // entirely; otherwise the digest comes from the bytes.
            let (bytes, sha256) = match &remote_asset.digest {
                Some(reported) if self.cache.read(reported)?.is_some() => {
                    debug!(asset = %spec.name, "resolved from cache");
                    let bytes = self
                        .cache
                        .read(reported)?
                        .ok_or_else(|| Error::validation("cache entry vanished"))?;
                    (bytes, reported.clone())
                }
                reported => {
                    let bytes = self.remote.download_asset(&remote_asset.download_url)?;
                    let computed = digest_bytes(&bytes);
                    if let Some(reported) = reported
                        && *reported != computed
                    {
                        warn!(
                            asset = %spec.name,
                            reported = %reported,
                            computed = %computed,
                            "store-reported digest disagrees with downloaded bytes"
                        );
                    }
                    self.cache.store(&computed, &bytes)?;
                    (bytes, computed)
                }
            };

            let files = self.archiver.list_members(&bytes)?;
            debug!(asset = %spec.name, digest = %sha256, files = files.len(), "pinned");
            assets.push(LockedAsset {
                name: spec.name.clone(),
                download_url: remote_asset.download_url.clone(),
                sha256,
                files,
            });
        }

        info!(
            repository = %manifest.repository,
            version = %manifest.version,
            assets = assets.len(),
            "resolved"
        );
        Ok(Lockfile {
            repository: manifest.repository.clone(),
            version: manifest.version.clone(),
            assets,
        })
    }
}
