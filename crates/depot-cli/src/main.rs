//! Depot CLI
//!
//! The command-line interface for versioned data assets.

mod cli;
mod commands;
mod error;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            eprintln!("warning: tracing subscriber already set");
        }
        tracing::debug!("Verbose mode enabled");
    }

    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} Versioned data assets", "depot".green().bold());
            println!();
            println!("Run {} for available commands.", "depot --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init {
            repository,
            version,
            force,
        } => {
            let cwd = std::env::current_dir()?;
            commands::run_init(&cwd, &repository, &version, force)
        }
        Commands::Resolve { manifest } => commands::run_resolve(&manifest),
        Commands::Pull {
            manifest,
            force,
            no_prune,
            jobs,
        } => commands::run_pull(&manifest, force, no_prune, jobs),
        Commands::Push {
            manifest,
            dry_run,
            force,
            jobs,
        } => commands::run_push(&manifest, dry_run, force, jobs),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "depot", &mut std::io::stdout());
            Ok(())
        }
    }
}
