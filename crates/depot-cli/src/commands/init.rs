//! Init command implementation
//!
//! Scaffolds a manifest and ignores the local state directory.

use std::path::Path;

use colored::Colorize;
use depot_core::{DEPOT_DIR, MANIFEST_FILE};

use crate::error::{CliError, Result};

/// Run the init command
pub fn run_init(path: &Path, repository: &str, version: &str, force: bool) -> Result<()> {
    let manifest_path = path.join(MANIFEST_FILE);
    if manifest_path.exists() && !force {
        return Err(CliError::user(format!(
            "{MANIFEST_FILE} already exists. Pass --force to overwrite."
        )));
    }

    println!(
        "{} Initializing depot for {}...",
        "=>".blue().bold(),
        repository.cyan()
    );

    std::fs::write(&manifest_path, scaffold(repository, version))?;
    ignore_state_dir(path)?;

    println!(
        "{} Wrote {}. Declare assets, then run {}.",
        "OK".green().bold(),
        MANIFEST_FILE,
        "depot resolve".cyan()
    );
    Ok(())
}

/// Generate the manifest scaffold
fn scaffold(repository: &str, version: &str) -> String {
    format!(
        "repository: \"{repository}\"\n\
         version: \"{version}\"\n\
         \n\
         # Declare assets here, for example:\n\
         #\n\
         # assets:\n\
         #   models:\n\
         #     source: \"build/models\"\n\
         #     destination: \"assets/models\"\n\
         #     excludes:\n\
         #       - \"**/*.tmp\"\n"
    )
}

/// Append `.depot/` to .gitignore unless already listed.
fn ignore_state_dir(path: &Path) -> Result<()> {
    let gitignore = path.join(".gitignore");
    let entry = format!("{DEPOT_DIR}/");
    let existing = match std::fs::read_to_string(&gitignore) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if existing.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&entry);
    updated.push('\n');
    std::fs::write(&gitignore, updated)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_manifest_and_gitignore() {
        let dir = tempfile::tempdir().unwrap();

        run_init(dir.path(), "acme/datasets", "v1.0.0", false).unwrap();

        let manifest = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(manifest.contains("repository: \"acme/datasets\""));
        assert!(manifest.contains("version: \"v1.0.0\""));
        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(gitignore.contains(".depot/"));
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        run_init(dir.path(), "acme/datasets", "v1", false).unwrap();

        let err = run_init(dir.path(), "acme/other", "v2", false).unwrap_err();
        assert!(err.to_string().contains("--force"));

        run_init(dir.path(), "acme/other", "v2", true).unwrap();
        let manifest = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(manifest.contains("acme/other"));
    }

    #[test]
    fn gitignore_entry_is_not_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/\n.depot/\n").unwrap();

        run_init(dir.path(), "acme/datasets", "v1", false).unwrap();

        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(gitignore.matches(".depot/").count(), 1);
    }
}
