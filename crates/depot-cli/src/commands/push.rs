//! Push command implementation

use std::sync::Arc;

use colored::Colorize;
use depot_core::sync::{PushOptions, PushOutcome};
use depot_core::{Error, LOCK_FILE, Lockfile, SyncEngine, ZipArchiver};

use crate::error::{CliError, Result};

use super::{load_context, open_remote, short_digest, wire_interrupt};

/// Run the push command
pub fn run_push(manifest_arg: &str, dry_run: bool, force: bool, jobs: usize) -> Result<()> {
    let (manifest, working_dir) = load_context(manifest_arg)?;
    let remote = open_remote()?;

    // Push works without a lockfile: a first publish starts from nothing
    // and writes the lock as it uploads.
    let mut lockfile = match Lockfile::load(&working_dir.join(LOCK_FILE)) {
        Ok(lockfile) => lockfile,
        Err(Error::LockfileNotFound { .. }) => Lockfile {
            repository: manifest.repository.clone(),
            version: manifest.version.clone(),
            assets: vec![],
        },
        Err(e) => return Err(e.into()),
    };

    let action = if dry_run { "Checking" } else { "Pushing" };
    println!(
        "{} {} {} asset(s) against {} @ {}...",
        "=>".blue().bold(),
        action,
        manifest.assets.len(),
        manifest.repository.cyan(),
        manifest.version.cyan()
    );

    let engine = SyncEngine::new(remote, Arc::new(ZipArchiver::new()), &working_dir);
    wire_interrupt(engine.cancel_flag());

    let options = PushOptions {
        dry_run,
        force,
        jobs,
    };
    let report = engine.push(&manifest, &mut lockfile, &options)?;

    let mut failures = 0;
    for asset in &report.assets {
        match &asset.outcome {
            PushOutcome::Unchanged => {
                println!("   {} {} unchanged", "-".dimmed(), asset.name.cyan());
            }
            PushOutcome::Pushed { sha256, files } => {
                println!(
                    "   {} {} {} ({} files)",
                    "+".green(),
                    asset.name.cyan(),
                    short_digest(sha256).dimmed(),
                    files
                );
            }
            PushOutcome::WouldPush {
                old_sha256,
                new_sha256,
                files,
            } => {
                let old = old_sha256.as_deref().map_or("(new)", short_digest);
                println!(
                    "   {} {} would push: {} -> {} ({} files)",
                    "~".cyan(),
                    asset.name.cyan(),
                    old.dimmed(),
                    short_digest(new_sha256).dimmed(),
                    files
                );
            }
            PushOutcome::SkippedConflict => {
                println!(
                    "   {} {} exists on remote, skipped (use --force to overwrite)",
                    "!".yellow(),
                    asset.name.cyan()
                );
            }
            PushOutcome::Failed { reason } => {
                failures += 1;
                println!("   {} {} {}", "!".red(), asset.name.cyan(), reason.red());
            }
        }
    }

    if failures > 0 {
        return Err(CliError::user(format!(
            "{failures} asset(s) failed to push"
        )));
    }
    if dry_run {
        println!("{} Dry run; nothing was uploaded.", "OK".green().bold());
    } else {
        println!("{} Push complete.", "OK".green().bold());
    }
    Ok(())
}
