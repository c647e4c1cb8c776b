//! GitHub releases as the production remote store
//!
//! Releases are addressed by tag via the REST API; objects are release
//! assets. Transient transport failures are retried with exponential
//! backoff; API-level answers (404, 422) are surfaced immediately.

use std::time::Duration;

use backoff::{ExponentialBackoff, retry};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ApiRelease, Release, RemoteAsset, RemoteError, RemoteStore, normalize_digest};

const API_ROOT: &str = "https://api.github.com";
const UPLOAD_ROOT: &str = "https://uploads.github.com";

/// Wire shape of an upload response.
#[derive(Debug, Deserialize)]
struct ApiUploadedAsset {
    name: String,
    browser_download_url: String,
    size: u64,
    digest: Option<String>,
}

/// Remote store backed by GitHub releases.
pub struct GithubStore {
    client: Client,
    token: Option<String>,
}

impl GithubStore {
    /// Build a store client.
    ///
    /// The token is read from `DEPOT_TOKEN`, falling back to `GITHUB_TOKEN`.
    /// Unauthenticated clients can read public repositories but not upload.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Transport`] if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, RemoteError> {
        let token = std::env::var("DEPOT_TOKEN")
            .or_else(|_| std::env::var("GITHUB_TOKEN"))
            .ok();
        let client = Client::builder()
            .user_agent(concat!("depot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        Ok(Self { client, token })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send with retry on transport errors only.
    fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Response, RemoteError> {
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..ExponentialBackoff::default()
        };
        retry(policy, || {
            build().send().map_err(|e| {
                warn!(error = %e, "request failed, retrying");
                backoff::Error::transient(RemoteError::transport(e.to_string()))
            })
        })
        .map_err(|e| match e {
            backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => err,
        })
    }

    fn check_auth(&self, response: &Response) -> Result<(), RemoteError> {
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(RemoteError::Auth {
                message: "token rejected".to_string(),
            }),
            StatusCode::FORBIDDEN => Err(RemoteError::Auth {
                message: "access denied; check token scopes or rate limits".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn fetch_api_release(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<Option<ApiRelease>, RemoteError> {
        let url = format!("{API_ROOT}/repos/{repository}/releases/tags/{tag}");
        let response = self.send(|| self.authorize(self.client.get(&url)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.check_auth(&response)?;
        if !response.status().is_success() {
            return Err(RemoteError::transport(format!(
                "release lookup returned {}",
                response.status()
            )));
        }
        let release: ApiRelease = response
            .json()
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        Ok(Some(release))
    }

    fn delete_asset(&self, repository: &str, asset_id: u64) -> Result<(), RemoteError> {
        let url = format!("{API_ROOT}/repos/{repository}/releases/assets/{asset_id}");
        let response = self.send(|| self.authorize(self.client.delete(&url)))?;
        self.check_auth(&response)?;
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(RemoteError::transport(format!(
                "asset delete returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

impl RemoteStore for GithubStore {
    fn get_release(&self, repository: &str, tag: &str) -> Result<Release, RemoteError> {
        match self.fetch_api_release(repository, tag)? {
            Some(api) => {
                debug!(repository, tag, assets = api.assets.len(), "release found");
                Ok(api.into_release(repository))
            }
            None => Err(RemoteError::NotFound {
                repository: repository.to_string(),
                tag: tag.to_string(),
            }),
        }
    }

    fn ensure_release(&self, repository: &str, tag: &str) -> Result<Release, RemoteError> {
        if let Some(api) = self.fetch_api_release(repository, tag)? {
            return Ok(api.into_release(repository));
        }

        debug!(repository, tag, "creating release");
        let url = format!("{API_ROOT}/repos/{repository}/releases");
        let body = serde_json::json!({ "tag_name": tag, "name": tag });
        let response = self.send(|| self.authorize(self.client.post(&url)).json(&body))?;
        self.check_auth(&response)?;

        // 422 means another client created the release between our lookup
        // and the create; re-fetch and use theirs.
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return self.get_release(repository, tag);
        }
        if !response.status().is_success() {
            return Err(RemoteError::transport(format!(
                "release create returned {}",
                response.status()
            )));
        }
        let api: ApiRelease = response
            .json()
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        Ok(api.into_release(repository))
    }

    fn download_asset(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let response = self.send(|| {
            let request = self.client.get(url).header("Accept", "application/octet-stream");
            match &self.token {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::transport(format!("object gone: {url}")));
        }
        self.check_auth(&response)?;
        if !response.status().is_success() {
            return Err(RemoteError::transport(format!(
                "download returned {}",
                response.status()
            )));
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| RemoteError::transport(e.to_string()))
    }

    fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        bytes: &[u8],
        overwrite: bool,
    ) -> Result<RemoteAsset, RemoteError> {
        // Re-fetch the release so the existence check reflects the store,
        // not a possibly stale snapshot.
        if let Some(api) = self.fetch_api_release(&release.repository, &release.tag)?
            && let Some(existing) = api.assets.iter().find(|a| a.name == name)
        {
            if !overwrite {
                return Err(RemoteError::Conflict {
                    name: name.to_string(),
                });
            }
            debug!(name, "replacing existing remote object");
            self.delete_asset(&release.repository, existing.id)?;
        }

        let url = format!(
            "{UPLOAD_ROOT}/repos/{}/releases/{}/assets?name={name}",
            release.repository, release.id
        );
        let payload = bytes.to_vec();
        let response = self.send(|| {
            self.authorize(self.client.post(&url))
                .header("Content-Type", "application/zip")
                .body(payload.clone())
        })?;
        self.check_auth(&response)?;
        if !response.status().is_success() {
            return Err(RemoteError::transport(format!(
                "upload returned {}",
                response.status()
            )));
        }

        let uploaded: ApiUploadedAsset = response
            .json()
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        Ok(RemoteAsset {
            name: uploaded.name,
            download_url: uploaded.browser_download_url,
            size: uploaded.size,
            digest: uploaded.digest.as_deref().and_then(normalize_digest),
        })
    }
}
