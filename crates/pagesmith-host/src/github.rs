//! GitHub REST implementation of [`RepoHost`]

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use pagesmith_config::{GithubConfig, Secret};
use pagesmith_utils::error::HostError;
use pagesmith_utils::http::{body_snippet, build_client};
use pagesmith_utils::redaction::redact_error_message;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::types::{
    DirEntry, PagesStatus, PutFile, RemoteFile, RepoCreation, RepoHost, WriteReceipt,
};

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw+json";
const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// GitHub REST client bound to one owner.
#[derive(Clone)]
pub struct GitHubHost {
    client: Client,
    api_base: Url,
    owner: String,
    token: Secret,
}

impl std::fmt::Debug for GitHubHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubHost")
            .field("api_base", &self.api_base.as_str())
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl GitHubHost {
    /// Build a client for the configured API base and owner.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Transport` if the API base is not a valid URL or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &GithubConfig, token: Secret) -> Result<Self, HostError> {
        let api_base = Url::parse(&config.api_base).map_err(|e| {
            HostError::Transport(format!("Invalid API base '{}': {}", config.api_base, e))
        })?;
        let client = build_client(REQUEST_TIMEOUT)
            .map_err(|e| HostError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base,
            owner: config.owner.clone(),
            token,
        })
    }

    /// Join path segments onto the API base, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Result<Url, HostError> {
        let mut url = self.api_base.clone();
        {
            let mut parts = url.path_segments_mut().map_err(|()| {
                HostError::Transport(format!("API base '{}' cannot be a base", self.api_base))
            })?;
            parts.pop_if_empty();
            parts.extend(segments);
        }
        Ok(url)
    }

    fn repo_url_for(&self, repo: &str, rest: &[&str]) -> Result<Url, HostError> {
        let mut segments = vec!["repos", self.owner.as_str(), repo];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    /// `contents/{path}`; an empty path addresses the root.
    fn contents_path_url(&self, repo: &str, path: &str) -> Result<Url, HostError> {
        let mut rest = vec!["contents"];
        rest.extend(path.split('/').filter(|s| !s.is_empty()));
        if path.is_empty() {
            rest.push("");
        }
        self.repo_url_for(repo, &rest)
    }

    /// `contents/{path}?ref={branch}`
    fn contents_url(&self, repo: &str, path: &str, branch: &str) -> Result<Url, HostError> {
        let mut url = self.contents_path_url(repo, path)?;
        url.query_pairs_mut().append_pair("ref", branch);
        Ok(url)
    }

    fn request(&self, builder: RequestBuilder, accept: &str) -> RequestBuilder {
        builder
            .bearer_auth(self.token.expose())
            .header(reqwest::header::ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response, HostError> {
        builder.send().await.map_err(|e| {
            HostError::Transport(format!(
                "{} failed: {}",
                what,
                redact_error_message(&e.to_string())
            ))
        })
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
        what: &str,
    ) -> Result<T, HostError> {
        response
            .json::<T>()
            .await
            .map_err(|e| HostError::Decode(format!("{}: {}", what, e)))
    }
}

/// Turn a non-success response into a `HostError`.
async fn rejection(response: Response) -> HostError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    map_error_status(status, &body)
}

fn map_error_status(status: StatusCode, body: &str) -> HostError {
    let message = redact_error_message(&body_snippet(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            HostError::Auth(format!("{} {}", status, message))
        }
        _ => HostError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    commit: CommitRef,
    content: CommitRef,
}

#[async_trait]
impl RepoHost for GitHubHost {
    fn owner(&self) -> &str {
        &self.owner
    }

    async fn create_repository(&self, name: &str) -> Result<RepoCreation, HostError> {
        let url = self.url(&["user", "repos"])?;
        let body = json!({
            "name": name,
            "private": false,
            "auto_init": true,
            "license_template": "mit",
        });
        let response = self
            .send(
                self.request(self.client.post(url), ACCEPT_JSON).json(&body),
                "create repository",
            )
            .await?;

        match response.status() {
            s if s.is_success() => Ok(RepoCreation::Created),
            StatusCode::UNPROCESSABLE_ENTITY => {
                debug!(repo = name, "Repository name already taken");
                Ok(RepoCreation::AlreadyExists)
            }
            _ => Err(rejection(response).await),
        }
    }

    async fn branch_head(&self, repo: &str, branch: &str) -> Result<String, HostError> {
        let url = self.repo_url_for(repo, &["branches", branch])?;
        let response = self
            .send(self.request(self.client.get(url), ACCEPT_JSON), "read branch")
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let branch: BranchResponse = Self::decode(response, "branch").await?;
        Ok(branch.commit.sha)
    }

    async fn get_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<RemoteFile>, HostError> {
        let url = self.contents_url(repo, path, branch)?;
        let response = self
            .send(self.request(self.client.get(url), ACCEPT_JSON), "probe file")
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(Self::decode(response, "file metadata").await?)),
            _ => Err(rejection(response).await),
        }
    }

    async fn put_file(&self, repo: &str, file: PutFile) -> Result<WriteReceipt, HostError> {
        let url = self.contents_path_url(repo, &file.path)?;
        let mut body = json!({
            "message": file.message,
            "content": BASE64.encode(&file.content),
            "branch": file.branch,
        });
        if let Some(sha) = &file.sha {
            body["sha"] = json!(sha);
        }

        let response = self
            .send(
                self.request(self.client.put(url), ACCEPT_JSON).json(&body),
                "write file",
            )
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let put: PutResponse = Self::decode(response, "write result").await?;
        Ok(WriteReceipt {
            commit: put.commit.sha,
            content_sha: put.content.sha,
        })
    }

    async fn list_directory(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<DirEntry>, HostError> {
        let url = self.contents_url(repo, path, branch)?;
        let response = self
            .send(
                self.request(self.client.get(url), ACCEPT_JSON),
                "list directory",
            )
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Self::decode(response, "directory listing").await
    }

    async fn fetch_raw(&self, repo: &str, path: &str, branch: &str) -> Result<Vec<u8>, HostError> {
        let url = self.contents_url(repo, path, branch)?;
        let response = self
            .send(self.request(self.client.get(url), ACCEPT_RAW), "fetch file")
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| HostError::Transport(format!("fetch file body: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn enable_pages(&self, repo: &str, branch: &str) -> Result<PagesStatus, HostError> {
        let url = self.repo_url_for(repo, &["pages"])?;
        let body = json!({
            "build_type": "legacy",
            "source": { "branch": branch, "path": "/" },
        });
        let response = self
            .send(
                self.request(self.client.post(url), ACCEPT_JSON).json(&body),
                "enable pages",
            )
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Ok(PagesStatus::AlreadyEnabled),
            s if s.is_success() => Ok(PagesStatus::Enabled),
            _ => Err(rejection(response).await),
        }
    }
}
