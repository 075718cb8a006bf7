//! GitHub contents API backend using reqwest
//!
//! API docs: https://docs.github.com/en/rest/repos/contents

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ContentStore, PutReceipt, RemoteFile};
use crate::config::StoreConfig;
use crate::error::StoreError;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct ContentsFile {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: Option<PutContentEntry>,
    commit: Option<PutCommitEntry>,
}

#[derive(Debug, Deserialize)]
struct PutContentEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutCommitEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Content store backed by a GitHub repository
pub struct GithubStore {
    client: Client,
    config: StoreConfig,
    user_agent: String,
}

impl GithubStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            user_agent: format!("obras-portal/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo
        )
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/contents/{}", self.repo_url(), path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", self.config.token))
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, &self.user_agent)
    }

    /// Turn a non-2xx response into an error, preferring the API's own message
    async fn error_from(response: Response, path: &str) -> StoreError {
        let status = response.status();
        let fallback = format!("GitHub API {}", status.as_u16());
        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or(fallback);

        if status == StatusCode::CONFLICT {
            StoreError::Conflict {
                path: path.to_string(),
                message,
            }
        } else {
            StoreError::Remote {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Decode a contents payload; GitHub wraps base64 at 60 columns
fn decode_content(encoded: &str) -> Result<Vec<u8>, StoreError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| StoreError::Decode(format!("invalid base64 content: {e}")))
}

#[async_trait]
impl ContentStore for GithubStore {
    fn backend_tag(&self) -> &'static str {
        "github"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn raw_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.raw_base_url(),
            path.trim_start_matches('/')
        )
    }

    async fn fetch_file(&self, path: &str) -> Result<Option<RemoteFile>, StoreError> {
        let response = self
            .authorized(self.client.get(self.contents_url(path)))
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(path, "Remote file does not exist yet");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response, path).await);
        }

        let file: ContentsFile = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("unexpected contents response for {path}: {e}")))?;

        let content = match (file.encoding.as_deref(), file.content.as_deref()) {
            (Some("base64"), Some(encoded)) => Some(decode_content(encoded)?),
            _ => None,
        };

        Ok(Some(RemoteFile {
            path: path.to_string(),
            content,
            sha: file.sha,
        }))
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<PutReceipt, StoreError> {
        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(content),
            branch: &self.config.branch,
            sha,
        };

        let response = self
            .authorized(self.client.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, path).await);
        }

        let result: PutContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("unexpected commit response for {path}: {e}")))?;

        tracing::info!(path, bytes = content.len(), "Committed file");

        Ok(PutReceipt {
            path: path.to_string(),
            sha: result.content.map(|c| c.sha).unwrap_or_default(),
            commit_sha: result.commit.map(|c| c.sha),
        })
    }

    async fn check_access(&self) -> Result<bool, StoreError> {
        let response = self
            .authorized(self.client.get(self.repo_url()))
            .send()
            .await?;
        let ok = response.status().is_success();
        tracing::debug!(status = response.status().as_u16(), "Access probe");
        Ok(ok)
    }

    async fn fetch_raw(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let nocache = chrono::Utc::now().timestamp_millis().to_string();
        let response = self
            .client
            .get(self.raw_url(path))
            .query(&[("nocache", nocache.as_str())])
            .header(AUTHORIZATION, format!("token {}", self.config.token))
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::Remote {
                status: response.status().as_u16(),
                message: format!("raw fetch of {path} failed"),
            });
        }

        let bytes = response.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }
}
