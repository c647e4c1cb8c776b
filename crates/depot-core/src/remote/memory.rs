//! In-memory remote store double.
//!
//! Behaves like the production store (releases keyed by repository and tag,
//! named objects, conflict on duplicate upload) while counting calls, so
//! tests can assert not just outcomes but that operations which should be
//! local made zero remote calls. Available to other crates through the
//! `test-support` feature.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use depot_fs::digest_bytes;

use super::{Release, RemoteAsset, RemoteError, RemoteStore};

#[derive(Default)]
struct State {
    next_id: u64,
    /// Keyed by `(repository, tag)`; object name -> bytes.
    releases: HashMap<(String, String), (u64, Vec<(String, Vec<u8>)>)>,
}

/// A remote store held entirely in memory.
#[derive(Default)]
pub struct InMemoryRemote {
    state: Mutex<State>,
    release_calls: AtomicUsize,
    download_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    report_digests: AtomicBool,
}

fn object_url(repository: &str, tag: &str, name: &str) -> String {
    format!("memory://{repository}/{tag}/{name}")
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled, releases report each object's SHA-256, as stores that
    /// compute digests server-side do.
    pub fn report_digests(&self, enabled: bool) {
        self.report_digests.store(enabled, Ordering::Relaxed);
    }

    /// Create an empty release if none exists.
    pub fn seed_release(&self, repository: &str, tag: &str) {
        let mut state = self.state.lock().unwrap();
        seed(&mut state, repository, tag);
    }

    /// Attach (or replace) an object on a release, creating the release if
    /// needed. Returns the object's download URL.
    pub fn seed_asset(
        &self,
        repository: &str,
        tag: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> String {
        let mut state = self.state.lock().unwrap();
        seed(&mut state, repository, tag);
        let key = (repository.to_string(), tag.to_string());
        let (_, objects) = state.releases.get_mut(&key).unwrap();
        objects.retain(|(n, _)| n != name);
        objects.push((name.to_string(), bytes));
        object_url(repository, tag, name)
    }

    /// Stored bytes for an object, if present.
    pub fn asset_bytes(&self, repository: &str, tag: &str, name: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let key = (repository.to_string(), tag.to_string());
        let (_, objects) = state.releases.get(&key)?;
        objects
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b.clone())
    }

    /// How many `get_release`/`ensure_release` calls were made.
    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::Relaxed)
    }

    /// How many downloads were made.
    pub fn download_count(&self) -> usize {
        self.download_calls.load(Ordering::Relaxed)
    }

    /// How many uploads were attempted.
    pub fn upload_count(&self) -> usize {
        self.upload_calls.load(Ordering::Relaxed)
    }

    fn build_release(&self, repository: &str, tag: &str, state: &State) -> Option<Release> {
        let key = (repository.to_string(), tag.to_string());
        let (id, objects) = state.releases.get(&key)?;
        let with_digests = self.report_digests.load(Ordering::Relaxed);
        Some(Release {
            id: *id,
            repository: repository.to_string(),
            tag: tag.to_string(),
            assets: objects
                .iter()
                .map(|(name, bytes)| RemoteAsset {
                    name: name.clone(),
                    download_url: object_url(repository, tag, name),
                    size: bytes.len() as u64,
                    digest: with_digests.then(|| digest_bytes(bytes)),
                })
                .collect(),
        })
    }
}

fn seed(state: &mut State, repository: &str, tag: &str) {
    let key = (repository.to_string(), tag.to_string());
    if !state.releases.contains_key(&key) {
        state.next_id += 1;
        let id = state.next_id;
        state.releases.insert(key, (id, Vec::new()));
    }
}

impl RemoteStore for InMemoryRemote {
    fn get_release(&self, repository: &str, tag: &str) -> Result<Release, RemoteError> {
        self.release_calls.fetch_add(1, Ordering::Relaxed);
        let state = self.state.lock().unwrap();
        self.build_release(repository, tag, &state)
            .ok_or_else(|| RemoteError::NotFound {
                repository: repository.to_string(),
                tag: tag.to_string(),
            })
    }

    fn ensure_release(&self, repository: &str, tag: &str) -> Result<Release, RemoteError> {
        self.release_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().unwrap();
        seed(&mut state, repository, tag);
        self.build_release(repository, tag, &state)
            .ok_or_else(|| RemoteError::transport("release vanished"))
    }

    fn download_asset(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        self.download_calls.fetch_add(1, Ordering::Relaxed);
        let state = self.state.lock().unwrap();
        for ((repository, tag), (_, objects)) in &state.releases {
            for (name, bytes) in objects {
                if object_url(repository, tag, name) == url {
                    return Ok(bytes.clone());
                }
            }
        }
        Err(RemoteError::transport(format!("unknown object url: {url}")))
    }

    fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        bytes: &[u8],
        overwrite: bool,
    ) -> Result<RemoteAsset, RemoteError> {
        self.upload_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().unwrap();
        let key = (release.repository.clone(), release.tag.clone());
        let (_, objects) = state
            .releases
            .get_mut(&key)
            .ok_or_else(|| RemoteError::transport("release does not exist"))?;

        if objects.iter().any(|(n, _)| n == name) {
            if !overwrite {
                return Err(RemoteError::Conflict {
                    name: name.to_string(),
                });
            }
            objects.retain(|(n, _)| n != name);
        }
        objects.push((name.to_string(), bytes.to_vec()));
        Ok(RemoteAsset {
            name: name.to_string(),
            download_url: object_url(&release.repository, &release.tag, name),
            size: bytes.len() as u64,
            digest: None,
        })
    }
}
