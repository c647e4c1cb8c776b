//! Resolve command implementation

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use depot_core::remote::RemoteStore;
use depot_core::{LOCK_FILE, Lockfile, Manifest, Resolver, ZipArchiver, cache_dir};
use depot_fs::ArchiveCache;

use crate::error::Result;

use super::{load_context, open_remote, short_digest};

/// Run the resolve command
pub fn run_resolve(manifest_arg: &str) -> Result<()> {
    let (manifest, working_dir) = load_context(manifest_arg)?;
    println!(
        "{} Resolving {} @ {}...",
        "=>".blue().bold(),
        manifest.repository.cyan(),
        manifest.version.cyan()
    );

    let remote = open_remote()?;
    let lockfile = resolve_manifest(&manifest, &working_dir, remote)?;
    lockfile.save(&working_dir.join(LOCK_FILE))?;

    println!(
        "{} Pinned {} asset(s) to {}.",
        "OK".green().bold(),
        lockfile.assets.len(),
        LOCK_FILE
    );
    for asset in &lockfile.assets {
        println!(
            "   {} {} {} ({} files)",
            "-".dimmed(),
            asset.name.cyan(),
            short_digest(&asset.sha256).dimmed(),
            asset.files.len()
        );
    }
    Ok(())
}

/// Resolve the manifest against the remote, warming the local cache.
pub(crate) fn resolve_manifest(
    manifest: &Manifest,
    working_dir: &Path,
    remote: Arc<dyn RemoteStore>,
) -> Result<Lockfile> {
    let resolver = Resolver::new(
        remote,
        Arc::new(ZipArchiver::new()),
        ArchiveCache::new(cache_dir(working_dir)),
    );
    Ok(resolver.resolve(manifest)?)
}
