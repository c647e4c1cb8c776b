//! Release-based remote object store
//!
//! The remote model is deliberately small: a store holds releases keyed by
//! `(repository, tag)`, and each release carries named downloadable objects.
//! Everything the resolver and sync engine need fits in four operations,
//! kept behind [`RemoteStore`] so tests can run against an in-memory double.

mod github;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use github::GithubStore;
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryRemote;

use serde::Deserialize;

/// Errors from the remote store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// No release exists for the requested tag.
    #[error("release '{tag}' not found for '{repository}'")]
    NotFound { repository: String, tag: String },

    /// Upload refused because the object already exists.
    #[error("remote object '{name}' already exists; pass --force to overwrite")]
    Conflict { name: String },

    /// The store rejected the credentials, or none were provided where
    /// required.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Network failure or unexpected store response.
    #[error("remote transport error: {message}")]
    Transport { message: String },
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// One downloadable object attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAsset {
    pub name: String,
    pub download_url: String,
    pub size: u64,
    /// Store-reported SHA-256, lowercase hex, when the store provides one.
    pub digest: Option<String>,
}

/// A release: a tagged collection of objects in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub id: u64,
    pub repository: String,
    pub tag: String,
    pub assets: Vec<RemoteAsset>,
}

impl Release {
    /// Look up an attached object by name.
    pub fn asset(&self, name: &str) -> Option<&RemoteAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// Capability interface over the remote store.
pub trait RemoteStore: Send + Sync {
    /// Fetch the release for `(repository, tag)`.
    ///
    /// # Errors
    ///
    /// [`RemoteError::NotFound`] when the tag has no release.
    fn get_release(&self, repository: &str, tag: &str) -> Result<Release, RemoteError>;

    /// Fetch the release, creating an empty one if it does not exist.
    ///
    /// # Errors
    ///
    /// Transport or authentication failures.
    fn ensure_release(&self, repository: &str, tag: &str) -> Result<Release, RemoteError>;

    /// Download an object's bytes by its URL.
    ///
    /// Takes the URL rather than a [`RemoteAsset`] so pull can work straight
    /// from lockfile entries without fetching the release first.
    ///
    /// # Errors
    ///
    /// Transport failures, or [`RemoteError::NotFound`] for a dead URL.
    fn download_asset(&self, url: &str) -> Result<Vec<u8>, RemoteError>;

    /// Attach an object to a release.
    ///
    /// With `overwrite` false, an existing object of the same name is a
    /// [`RemoteError::Conflict`]; with it true the object is replaced.
    ///
    /// # Errors
    ///
    /// Conflict, transport, or authentication failures.
    fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        bytes: &[u8],
        overwrite: bool,
    ) -> Result<RemoteAsset, RemoteError>;
}

/// Normalize a store-reported digest to bare lowercase hex.
///
/// Stores report digests with an algorithm prefix (`sha256:<hex>`); anything
/// not SHA-256 is discarded so callers fall back to computing locally.
pub(crate) fn normalize_digest(raw: &str) -> Option<String> {
    raw.strip_prefix("sha256:")
        .map(|hex| hex.to_ascii_lowercase())
}

/// Wire shape of a release, as the store's API reports it.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiRelease {
    pub id: u64,
    pub tag_name: String,
    pub assets: Vec<ApiAsset>,
}

/// Wire shape of a release asset.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiAsset {
    pub id: u64,
    pub name: String,
    pub browser_download_url: String,
    pub size: u64,
    pub digest: Option<String>,
}

impl ApiRelease {
    pub(crate) fn into_release(self, repository: &str) -> Release {
        Release {
            id: self.id,
            repository: repository.to_string(),
            tag: self.tag_name,
            assets: self
                .assets
                .into_iter()
                .map(|a| RemoteAsset {
                    name: a.name,
                    download_url: a.browser_download_url,
                    size: a.size,
                    digest: a.digest.as_deref().and_then(normalize_digest),
                })
                .collect(),
        }
    }
}
