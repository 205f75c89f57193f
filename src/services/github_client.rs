//! GitHub API client.
//!
//! Thin HTTP layer over the REST endpoints the publisher needs: app
//! installation exchange and the git data API. Authorization is passed per
//! request because the bearer changes over a session (app JWT first, then
//! the installation token).

use crate::config::{GitHubSettings, RepoTarget};
use crate::error::AppError;
use crate::models::git_objects::{
    ContentResponse, CreateBlobRequest, CreateCommitRequest, CreateTreeRequest, GitObjectResponse,
    GitRefResponse, InstallationResponse, InstallationTokenResponse, UpdateRefRequest,
};
use crate::models::TreeEntry;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Media type GitHub recommends for REST calls.
const ACCEPT_JSON: &str = "application/vnd.github+json";

/// Pinned REST API version.
const API_VERSION: &str = "2022-11-28";

/// Git data operations the publish pipeline drives.
///
/// Every call takes the installation token it should authorize with.
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Commit SHA the branch currently points at.
    async fn get_branch_tip(&self, token: &str, target: &RepoTarget) -> Result<String, AppError>;

    /// Upload base64 content, returning the blob SHA.
    async fn create_blob(
        &self,
        token: &str,
        target: &RepoTarget,
        content_base64: &str,
    ) -> Result<String, AppError>;

    /// Layer `entries` onto `base_tree`, returning the new tree SHA.
    async fn create_tree(
        &self,
        token: &str,
        target: &RepoTarget,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, AppError>;

    /// Create a single-parent commit, returning its SHA.
    async fn create_commit(
        &self,
        token: &str,
        target: &RepoTarget,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> Result<String, AppError>;

    /// Force-move the branch to `commit_sha`.
    async fn update_branch(
        &self,
        token: &str,
        target: &RepoTarget,
        commit_sha: &str,
    ) -> Result<(), AppError>;

    /// Raw bytes of `path` on the branch, `None` if it does not exist.
    async fn read_file(
        &self,
        token: &str,
        target: &RepoTarget,
        path: &str,
    ) -> Result<Option<Vec<u8>>, AppError>;
}

/// GitHub App installation exchange, authorized with the app JWT.
#[async_trait]
pub trait AppInstallationApi: Send + Sync {
    /// Installation of the app on `owner/repo`.
    async fn installation_id(&self, jwt: &str, owner: &str, repo: &str) -> Result<u64, AppError>;

    /// Fresh access token for an installation.
    async fn installation_token(&self, jwt: &str, installation_id: u64)
        -> Result<String, AppError>;
}

/// GitHub API client configuration.
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    /// REST API base URL (e.g., `https://api.github.com`).
    pub base_url: String,

    /// User-Agent header; GitHub rejects requests without one.
    pub user_agent: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            user_agent: format!("site-publisher/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
        }
    }
}

impl From<&GitHubSettings> for GitHubClientConfig {
    fn from(settings: &GitHubSettings) -> Self {
        Self {
            base_url: settings.api_base_url.clone(),
            user_agent: settings.user_agent.clone(),
            timeout_secs: settings.timeout_secs,
        }
    }
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubClientConfig,
}

impl GitHubClient {
    /// Create a new GitHub client.
    pub fn new(config: GitHubClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT_JSON));
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static(API_VERSION),
        );
        let user_agent = header::HeaderValue::from_str(&config.user_agent)
            .map_err(|_| AppError::invalid_input_field("Invalid User-Agent", "userAgent"))?;
        headers.insert(header::USER_AGENT, user_agent);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Full URL for an API path.
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn repo_path(target: &RepoTarget, suffix: &str) -> String {
        format!(
            "/repos/{}/{}{}",
            urlencoding::encode(&target.owner),
            urlencoding::encode(&target.repo),
            suffix
        )
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request.bearer_auth(token)
    }

    /// Handle API response errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: &str,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| AppError::internal(format!("Failed to parse response: {}", e)));
        }

        let status_code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        // GitHub returns errors as {"message": "...", "documentation_url": "..."}
        let body_message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str().map(str::to_string)));

        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::upstream_auth_status(
                body_message.unwrap_or_else(|| "Bad credentials".to_string()),
                status_code,
            ));
        }

        let message = match body_message {
            Some(msg) => msg,
            None if body.is_empty() => format!("Request failed ({})", status_code),
            None => format!("Request failed ({}): {}", status_code, body),
        };

        Err(AppError::github_api_full(message, status_code, endpoint))
    }

    /// Raw blob by SHA, for files too large for the contents API.
    async fn read_blob(
        &self,
        token: &str,
        target: &RepoTarget,
        path: &str,
        sha: &str,
    ) -> Result<Vec<u8>, AppError> {
        let endpoint = Self::repo_path(target, &format!("/git/blobs/{}", urlencoding::encode(sha)));
        let response = self
            .authorized(self.client.get(self.api_url(&endpoint)), token)
            .send()
            .await?;
        let blob: ContentResponse = self.handle_response(response, &endpoint).await?;
        match (blob.encoding.as_deref(), blob.content) {
            (Some("base64"), Some(content)) => decode_content(path, &content),
            (encoding, _) => Err(AppError::internal(format!(
                "Blob {} for {} has unsupported encoding {}",
                sha,
                path,
                encoding.unwrap_or("(none)")
            ))),
        }
    }
}

/// Percent-encode each segment of a repository path, keeping the slashes.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl GitHost for GitHubClient {
    async fn get_branch_tip(&self, token: &str, target: &RepoTarget) -> Result<String, AppError> {
        let endpoint = Self::repo_path(
            target,
            &format!("/git/ref/heads/{}", encode_path(&target.branch)),
        );
        let response = self
            .authorized(self.client.get(self.api_url(&endpoint)), token)
            .send()
            .await?;
        let git_ref: GitRefResponse = self.handle_response(response, &endpoint).await?;
        log::debug!("{} points at {}", git_ref.ref_name, git_ref.object.sha);
        Ok(git_ref.object.sha)
    }

    async fn create_blob(
        &self,
        token: &str,
        target: &RepoTarget,
        content_base64: &str,
    ) -> Result<String, AppError> {
        let endpoint = Self::repo_path(target, "/git/blobs");
        let body = CreateBlobRequest {
            content: content_base64,
            encoding: "base64",
        };
        let response = self
            .authorized(self.client.post(self.api_url(&endpoint)), token)
            .json(&body)
            .send()
            .await?;
        let blob: GitObjectResponse = self.handle_response(response, &endpoint).await?;
        Ok(blob.sha)
    }

    async fn create_tree(
        &self,
        token: &str,
        target: &RepoTarget,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, AppError> {
        let endpoint = Self::repo_path(target, "/git/trees");
        let body = CreateTreeRequest {
            base_tree,
            tree: entries,
        };
        let response = self
            .authorized(self.client.post(self.api_url(&endpoint)), token)
            .json(&body)
            .send()
            .await?;
        let tree: GitObjectResponse = self.handle_response(response, &endpoint).await?;
        Ok(tree.sha)
    }

    async fn create_commit(
        &self,
        token: &str,
        target: &RepoTarget,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> Result<String, AppError> {
        let endpoint = Self::repo_path(target, "/git/commits");
        let body = CreateCommitRequest {
            message,
            tree,
            parents: vec![parent],
        };
        let response = self
            .authorized(self.client.post(self.api_url(&endpoint)), token)
            .json(&body)
            .send()
            .await?;
        let commit: GitObjectResponse = self.handle_response(response, &endpoint).await?;
        Ok(commit.sha)
    }

    async fn update_branch(
        &self,
        token: &str,
        target: &RepoTarget,
        commit_sha: &str,
    ) -> Result<(), AppError> {
        let endpoint = Self::repo_path(
            target,
            &format!("/git/refs/heads/{}", encode_path(&target.branch)),
        );
        let body = UpdateRefRequest {
            sha: commit_sha,
            force: true,
        };
        let response = self
            .authorized(self.client.patch(self.api_url(&endpoint)), token)
            .json(&body)
            .send()
            .await?;
        let _: GitRefResponse = self.handle_response(response, &endpoint).await?;
        Ok(())
    }

    async fn read_file(
        &self,
        token: &str,
        target: &RepoTarget,
        path: &str,
    ) -> Result<Option<Vec<u8>>, AppError> {
        let endpoint = Self::repo_path(target, &format!("/contents/{}", encode_path(path)));
        let response = self
            .authorized(self.client.get(self.api_url(&endpoint)), token)
            .query(&[("ref", target.branch.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let file: ContentResponse = self.handle_response(response, &endpoint).await?;
        match (file.encoding.as_deref(), file.content) {
            (Some("base64"), Some(content)) => decode_content(path, &content).map(Some),
            // Files over 1 MB come back with encoding "none" and no content
            _ => {
                log::debug!("{} has no inline content, reading blob {}", path, file.sha);
                self.read_blob(token, target, path, &file.sha).await.map(Some)
            }
        }
    }
}

/// Decode base64 file content; GitHub wraps it at 60 columns.
fn decode_content(path: &str, content: &str) -> Result<Vec<u8>, AppError> {
    let compact: String = content.split_whitespace().collect();
    STANDARD
        .decode(compact)
        .map_err(|e| AppError::internal(format!("Invalid base64 in {}: {}", path, e)))
}

#[async_trait]
impl AppInstallationApi for GitHubClient {
    async fn installation_id(&self, jwt: &str, owner: &str, repo: &str) -> Result<u64, AppError> {
        let endpoint = format!(
            "/repos/{}/{}/installation",
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        );
        let response = self
            .authorized(self.client.get(self.api_url(&endpoint)), jwt)
            .send()
            .await?;
        let installation: InstallationResponse = self.handle_response(response, &endpoint).await?;
        Ok(installation.id)
    }

    async fn installation_token(
        &self,
        jwt: &str,
        installation_id: u64,
    ) -> Result<String, AppError> {
        let endpoint = format!("/app/installations/{}/access_tokens", installation_id);
        let response = self
            .authorized(self.client.post(self.api_url(&endpoint)), jwt)
            .send()
            .await?;
        let token: InstallationTokenResponse = self.handle_response(response, &endpoint).await?;
        if let Some(expires_at) = &token.expires_at {
            log::debug!("Installation token expires at {}", expires_at);
        }
        Ok(token.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_construction() {
        let client = GitHubClient::new(GitHubClientConfig {
            base_url: "https://api.github.com/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.api_url("/app/installations/1/access_tokens"),
            "https://api.github.com/app/installations/1/access_tokens"
        );
    }

    #[test]
    fn test_repo_path_encodes_segments() {
        let target = RepoTarget {
            owner: "octo".to_string(),
            repo: "my site".to_string(),
            branch: "main".to_string(),
        };
        assert_eq!(
            GitHubClient::repo_path(&target, "/git/blobs"),
            "/repos/octo/my%20site/git/blobs"
        );
    }

    #[test]
    fn test_encode_path_keeps_slashes() {
        assert_eq!(
            encode_path("/public/blogs/hello world/index.md"),
            "public/blogs/hello%20world/index.md"
        );
        assert_eq!(encode_path("feature/x"), "feature/x");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = GitHubSettings {
            api_base_url: "http://localhost:9999".to_string(),
            timeout_secs: 5,
            ..Default::default()
        };
        let config = GitHubClientConfig::from(&settings);
        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.timeout_secs, 5);
    }
}
