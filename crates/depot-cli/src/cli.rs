//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Depot - Versioned data assets pinned next to your code
#[derive(Parser, Debug)]
#[command(name = "depot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Initialize a depot manifest in the current directory
    ///
    /// Creates depot.yml and adds .depot/ to .gitignore.
    Init {
        /// Remote repository, owner/repo
        #[arg(short, long, default_value = "owner/repo")]
        repository: String,

        /// Release tag to target
        #[arg(long, default_value = "v0.1.0")]
        version: String,

        /// Overwrite an existing manifest
        #[arg(short, long)]
        force: bool,
    },

    /// Resolve the manifest against the remote and write depot.lock
    Resolve {
        /// Path to the manifest
        #[arg(short, long, default_value = depot_core::MANIFEST_FILE)]
        manifest: String,
    },

    /// Pull locked assets into their destinations
    ///
    /// Resolves first when the lockfile is missing or pinned to a
    /// different repository or version than the manifest.
    Pull {
        /// Path to the manifest
        #[arg(short, long, default_value = depot_core::MANIFEST_FILE)]
        manifest: String,

        /// Re-fetch and re-extract even when already applied
        #[arg(short, long)]
        force: bool,

        /// Keep previously-managed files that are no longer in an asset
        #[arg(long)]
        no_prune: bool,

        /// Number of parallel workers
        #[arg(short, long, default_value_t = depot_core::sync::DEFAULT_JOBS)]
        jobs: usize,
    },

    /// Pack source directories and upload changed assets
    Push {
        /// Path to the manifest
        #[arg(short, long, default_value = depot_core::MANIFEST_FILE)]
        manifest: String,

        /// Report what would be uploaded without remote calls
        #[arg(long)]
        dry_run: bool,

        /// Overwrite existing remote objects
        #[arg(short, long)]
        force: bool,

        /// Number of parallel workers
        #[arg(short, long, default_value_t = depot_core::sync::DEFAULT_JOBS)]
        jobs: usize,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}
