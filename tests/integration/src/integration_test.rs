//! End-to-end flow: push -> resolve -> pull against an in-memory remote
//!
//! These tests drive the real resolver and sync engine through the full
//! lifecycle a user goes through: publish assets from one working copy,
//! resolve and pull them into another, iterate a new release, prune.

use std::sync::Arc;

use depot_core::remote::{InMemoryRemote, RemoteStore};
use depot_core::sync::{PullOptions, PullOutcome, PushOptions, PushOutcome};
use depot_core::{
    LOCK_FILE, Lockfile, MANIFEST_FILE, Manifest, Resolver, SyncEngine, ZipArchiver, cache_dir,
};
use depot_fs::ArchiveCache;
use depot_test_utils::TestWorkspace;
use pretty_assertions::assert_eq;

fn load_manifest(ws: &TestWorkspace) -> Manifest {
    Manifest::load(&ws.root().join(MANIFEST_FILE)).unwrap()
}

fn engine(ws: &TestWorkspace, remote: &Arc<InMemoryRemote>) -> SyncEngine {
    let remote: Arc<dyn RemoteStore> = remote.clone();
    SyncEngine::new(remote, Arc::new(ZipArchiver::new()), ws.root())
}

fn resolver(ws: &TestWorkspace, remote: &Arc<InMemoryRemote>) -> Resolver {
    let remote: Arc<dyn RemoteStore> = remote.clone();
    Resolver::new(
        remote,
        Arc::new(ZipArchiver::new()),
        ArchiveCache::new(cache_dir(ws.root())),
    )
}

/// Publisher workspace with two assets and some source files.
fn publisher() -> TestWorkspace {
    let ws = TestWorkspace::new();
    ws.write_manifest_with_assets(
        "acme/datasets",
        "v1.0.0",
        &[
            ("models", "build/models", "assets/models"),
            ("textures", "build/textures", "assets/textures"),
        ],
    );
    ws.write_file("build/models/weights/model.bin", b"weights-v1");
    ws.write_file("build/models/config.json", b"{\"layers\": 4}");
    ws.write_file("build/textures/grass.png", b"png-bytes");
    ws
}

/// Consumer workspace with the same manifest but no sources.
fn consumer() -> TestWorkspace {
    let ws = TestWorkspace::new();
    ws.write_manifest_with_assets(
        "acme/datasets",
        "v1.0.0",
        &[
            ("models", "build/models", "assets/models"),
            ("textures", "build/textures", "assets/textures"),
        ],
    );
    ws
}

#[test]
fn publish_then_consume_round_trips() {
    let remote = Arc::new(InMemoryRemote::new());

    // Publish.
    let pub_ws = publisher();
    let manifest = load_manifest(&pub_ws);
    let mut lockfile = Lockfile {
        repository: manifest.repository.clone(),
        version: manifest.version.clone(),
        assets: vec![],
    };
    let report = engine(&pub_ws, &remote)
        .push(&manifest, &mut lockfile, &PushOptions::default())
        .unwrap();
    assert!(report.success());
    assert!(matches!(report.get("models"), Some(PushOutcome::Pushed { .. })));

    // Consume on a clean machine.
    let con_ws = consumer();
    let con_manifest = load_manifest(&con_ws);
    let resolved = resolver(&con_ws, &remote).resolve(&con_manifest).unwrap();
    resolved.save(&con_ws.root().join(LOCK_FILE)).unwrap();

    let report = engine(&con_ws, &remote)
        .pull(&con_manifest, &resolved, &PullOptions::default())
        .unwrap();
    assert!(report.success());

    con_ws.assert_file_content("assets/models/weights/model.bin", b"weights-v1");
    con_ws.assert_file_content("assets/models/config.json", b"{\"layers\": 4}");
    con_ws.assert_file_content("assets/textures/grass.png", b"png-bytes");
}

#[test]
fn resolve_is_deterministic_on_disk() {
    let remote = Arc::new(InMemoryRemote::new());
    let pub_ws = publisher();
    let manifest = load_manifest(&pub_ws);
    let mut lockfile = Lockfile {
        repository: manifest.repository.clone(),
        version: manifest.version.clone(),
        assets: vec![],
    };
    engine(&pub_ws, &remote)
        .push(&manifest, &mut lockfile, &PushOptions::default())
        .unwrap();

    let con_ws = consumer();
    let con_manifest = load_manifest(&con_ws);
    let first = resolver(&con_ws, &remote)
        .resolve(&con_manifest)
        .unwrap()
        .to_json()
        .unwrap();
    let second = resolver(&con_ws, &remote)
        .resolve(&con_manifest)
        .unwrap()
        .to_json()
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn second_pull_makes_zero_remote_calls() {
    let remote = Arc::new(InMemoryRemote::new());
    let pub_ws = publisher();
    let manifest = load_manifest(&pub_ws);
    let mut lockfile = Lockfile {
        repository: manifest.repository.clone(),
        version: manifest.version.clone(),
        assets: vec![],
    };
    engine(&pub_ws, &remote)
        .push(&manifest, &mut lockfile, &PushOptions::default())
        .unwrap();

    let con_ws = consumer();
    let con_manifest = load_manifest(&con_ws);
    let resolved = resolver(&con_ws, &remote).resolve(&con_manifest).unwrap();
    let eng = engine(&con_ws, &remote);
    eng.pull(&con_manifest, &resolved, &PullOptions::default())
        .unwrap();

    let downloads = remote.download_count();
    let releases = remote.release_calls();
    let report = eng
        .pull(&con_manifest, &resolved, &PullOptions::default())
        .unwrap();

    assert_eq!(report.get("models"), Some(&PullOutcome::UpToDate));
    assert_eq!(report.get("textures"), Some(&PullOutcome::UpToDate));
    assert_eq!(remote.download_count(), downloads);
    assert_eq!(remote.release_calls(), releases);
}

#[test]
fn new_release_prunes_dropped_files_but_not_user_files() {
    let remote = Arc::new(InMemoryRemote::new());

    // v1 publishes two files in the models asset.
    let pub_ws = publisher();
    let manifest_v1 = load_manifest(&pub_ws);
    let mut lockfile = Lockfile {
        repository: manifest_v1.repository.clone(),
        version: manifest_v1.version.clone(),
        assets: vec![],
    };
    engine(&pub_ws, &remote)
        .push(&manifest_v1, &mut lockfile, &PushOptions::default())
        .unwrap();

    let con_ws = consumer();
    let con_manifest = load_manifest(&con_ws);
    let resolved_v1 = resolver(&con_ws, &remote).resolve(&con_manifest).unwrap();
    let eng = engine(&con_ws, &remote);
    eng.pull(&con_manifest, &resolved_v1, &PullOptions::default())
        .unwrap();
    con_ws.write_file("assets/models/notes.md", b"user notes");

    // v2 drops config.json from the models asset.
    std::fs::remove_file(pub_ws.root().join("build/models/config.json")).unwrap();
    pub_ws.write_manifest_with_assets(
        "acme/datasets",
        "v2.0.0",
        &[
            ("models", "build/models", "assets/models"),
            ("textures", "build/textures", "assets/textures"),
        ],
    );
    let manifest_v2 = load_manifest(&pub_ws);
    engine(&pub_ws, &remote)
        .push(&manifest_v2, &mut lockfile, &PushOptions::default())
        .unwrap();

    con_ws.write_manifest_with_assets(
        "acme/datasets",
        "v2.0.0",
        &[
            ("models", "build/models", "assets/models"),
            ("textures", "build/textures", "assets/textures"),
        ],
    );
    let con_manifest_v2 = load_manifest(&con_ws);
    let resolved_v2 = resolver(&con_ws, &remote).resolve(&con_manifest_v2).unwrap();
    eng.pull(&con_manifest_v2, &resolved_v2, &PullOptions::default())
        .unwrap();

    con_ws.assert_file_not_exists("assets/models/config.json");
    con_ws.assert_file_exists("assets/models/weights/model.bin");
    con_ws.assert_file_content("assets/models/notes.md", b"user notes");
}

#[test]
fn unchanged_push_after_publish_uploads_nothing() {
    let remote = Arc::new(InMemoryRemote::new());
    let pub_ws = publisher();
    let manifest = load_manifest(&pub_ws);
    let mut lockfile = Lockfile {
        repository: manifest.repository.clone(),
        version: manifest.version.clone(),
        assets: vec![],
    };
    let eng = engine(&pub_ws, &remote);
    eng.push(&manifest, &mut lockfile, &PushOptions::default())
        .unwrap();
    let uploads = remote.upload_count();

    let report = eng
        .push(&manifest, &mut lockfile, &PushOptions::default())
        .unwrap();

    assert_eq!(report.get("models"), Some(&PushOutcome::Unchanged));
    assert_eq!(report.get("textures"), Some(&PushOutcome::Unchanged));
    assert_eq!(remote.upload_count(), uploads);
}

#[test]
fn pushed_lockfile_lets_pull_skip_the_publishers_own_assets() {
    let remote = Arc::new(InMemoryRemote::new());
    let pub_ws = publisher();
    let manifest = load_manifest(&pub_ws);
    let mut lockfile = Lockfile {
        repository: manifest.repository.clone(),
        version: manifest.version.clone(),
        assets: vec![],
    };
    let eng = engine(&pub_ws, &remote);
    eng.push(&manifest, &mut lockfile, &PushOptions::default())
        .unwrap();

    // The lock written by push is loadable and internally consistent.
    let on_disk = Lockfile::load(&pub_ws.root().join(LOCK_FILE)).unwrap();
    assert_eq!(on_disk, lockfile);
    let names: Vec<_> = on_disk.assets.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["models", "textures"]);

    // Pulling from it works and extracts into destinations.
    let report = eng
        .pull(&manifest, &on_disk, &PullOptions::default())
        .unwrap();
    assert!(report.success());
    pub_ws.assert_file_content("assets/models/weights/model.bin", b"weights-v1");
}
