//! Pull command implementation
//!
//! Applies the lockfile's pinned state, resolving first when the lock is
//! missing or pinned to a different repository or version than the manifest.

use std::sync::Arc;

use colored::Colorize;
use depot_core::sync::{PullOptions, PullOutcome};
use depot_core::{Error, LOCK_FILE, Lockfile, SyncEngine, ZipArchiver};

use crate::error::{CliError, Result};

use super::resolve::resolve_manifest;
use super::{load_context, open_remote, wire_interrupt};

/// Run the pull command
pub fn run_pull(manifest_arg: &str, force: bool, no_prune: bool, jobs: usize) -> Result<()> {
    let (manifest, working_dir) = load_context(manifest_arg)?;
    let remote = open_remote()?;
    let lock_path = working_dir.join(LOCK_FILE);

    let lockfile = match Lockfile::load(&lock_path) {
        Ok(lockfile)
            if lockfile.repository == manifest.repository
                && lockfile.version == manifest.version =>
        {
            lockfile
        }
        Ok(_) => {
            println!(
                "{} Lockfile is pinned to a different release; resolving {} first...",
                "=>".blue().bold(),
                manifest.version.cyan()
            );
            let lockfile = resolve_manifest(&manifest, &working_dir, Arc::clone(&remote))?;
            lockfile.save(&lock_path)?;
            lockfile
        }
        Err(Error::LockfileNotFound { .. }) => {
            println!("{} No lockfile; resolving first...", "=>".blue().bold());
            let lockfile = resolve_manifest(&manifest, &working_dir, Arc::clone(&remote))?;
            lockfile.save(&lock_path)?;
            lockfile
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "{} Pulling {} asset(s) from {} @ {}...",
        "=>".blue().bold(),
        lockfile.assets.len(),
        lockfile.repository.cyan(),
        lockfile.version.cyan()
    );

    let engine = SyncEngine::new(remote, Arc::new(ZipArchiver::new()), &working_dir);
    wire_interrupt(engine.cancel_flag());

    let options = PullOptions {
        force,
        prune: !no_prune,
        jobs,
    };
    let report = engine.pull(&manifest, &lockfile, &options)?;

    let mut failures = 0;
    for asset in &report.assets {
        match &asset.outcome {
            PullOutcome::UpToDate => {
                println!("   {} {} up to date", "-".dimmed(), asset.name.cyan());
            }
            PullOutcome::Pulled { files, pruned } => {
                let mut line = format!("{files} file(s)");
                if *pruned > 0 {
                    line.push_str(&format!(", pruned {pruned}"));
                }
                println!("   {} {} {}", "+".green(), asset.name.cyan(), line);
            }
            PullOutcome::Failed { reason } => {
                failures += 1;
                println!("   {} {} {}", "!".red(), asset.name.cyan(), reason.red());
            }
        }
    }

    if failures > 0 {
        return Err(CliError::user(format!(
            "{failures} asset(s) failed to pull"
        )));
    }
    println!("{} Working directory matches the lockfile.", "OK".green().bold());
    Ok(())
}
