//! Command implementations for depot-cli

pub mod init;
pub mod pull;
pub mod push;
pub mod resolve;

pub use init::run_init;
pub use pull::run_pull;
pub use push::run_push;
pub use resolve::run_resolve;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use depot_core::remote::{GithubStore, RemoteStore};
use depot_core::{Error, Manifest};

use crate::error::Result;

/// Load the manifest and derive the working directory it governs.
///
/// All state (lockfile, `.depot/`, sources, destinations) is relative to the
/// manifest's directory, so `--manifest` also selects the working dir.
pub(crate) fn load_context(manifest_arg: &str) -> Result<(Manifest, PathBuf)> {
    let manifest_path = std::env::current_dir()?.join(manifest_arg);
    let manifest = Manifest::load(&manifest_path)?;
    let working_dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::validation("manifest path has no parent directory"))?;
    Ok((manifest, working_dir))
}

/// The production remote store.
pub(crate) fn open_remote() -> Result<Arc<dyn RemoteStore>> {
    let store = GithubStore::new().map_err(Error::from)?;
    Ok(Arc::new(store))
}

/// First 12 characters of a digest for display. Lockfiles are user-editable
/// JSON, so a digest shorter than that passes through whole instead of
/// panicking on the slice.
pub(crate) fn short_digest(sha256: &str) -> &str {
    sha256.get(..12).unwrap_or(sha256)
}

/// Flip `flag` on Ctrl-C so workers stop scheduling new assets.
pub(crate) fn wire_interrupt(flag: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        eprintln!(
            "\n{} interrupted, finishing in-flight work...",
            "!".yellow().bold()
        );
        flag.store(true, Ordering::Relaxed);
    });
    // A second handler registration (tests, repeated runs in-process) is
    // not worth failing the command over.
    if let Err(e) = result {
        tracing::debug!(error = %e, "could not install interrupt handler");
    }
}
