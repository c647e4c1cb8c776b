//! CLI surface tests
//!
//! Network-free paths only: scaffolding, argument validation, and the error
//! messages users hit before any remote call is made.

use assert_cmd::Command;
use predicates::prelude::*;

fn depot() -> Command {
    Command::cargo_bin("depot").unwrap()
}

#[test]
fn no_arguments_prints_help_hint() {
    depot()
        .assert()
        .success()
        .stdout(predicate::str::contains("depot --help"));
}

#[test]
fn init_scaffolds_manifest_and_gitignore() {
    let dir = tempfile::tempdir().unwrap();

    depot()
        .current_dir(dir.path())
        .args(["init", "--repository", "acme/datasets", "--version", "v1.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("depot.yml"));

    let manifest = std::fs::read_to_string(dir.path().join("depot.yml")).unwrap();
    assert!(manifest.contains("acme/datasets"));
    let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
    assert!(gitignore.contains(".depot/"));
}

#[test]
fn init_twice_fails_without_force() {
    let dir = tempfile::tempdir().unwrap();
    depot().current_dir(dir.path()).arg("init").assert().success();

    depot()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn resolve_without_manifest_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();

    depot()
        .current_dir(dir.path())
        .arg("resolve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest not found"));
}

#[test]
fn pull_with_invalid_manifest_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("depot.yml"),
        "repository: \"acme/datasets\"\nversion: \"v1\"\nassets:\n  data:\n    source: \"d\"\n",
    )
    .unwrap();

    depot()
        .current_dir(dir.path())
        .arg("pull")
        .assert()
        .failure()
        .stderr(predicate::str::contains("destination"));
}

#[test]
fn overlapping_destinations_are_rejected_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("depot.yml"),
        "repository: \"acme/datasets\"\nversion: \"v1\"\nassets:\n  all:\n    destination: \"assets\"\n  models:\n    destination: \"assets/models\"\n",
    )
    .unwrap();

    depot()
        .current_dir(dir.path())
        .arg("push")
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("overlap"));
}

#[test]
fn completions_emit_a_script() {
    depot()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("depot"));
}
