//! Remote content store
//!
//! A path-addressed file store with version tokens: every write is one
//! commit, overwrites must present the token of the revision they replace.

pub mod github;
pub mod memory;

pub use github::GithubStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StoreError;

/// Current content of a remote file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    /// Decoded bytes; `None` when the API did not inline the content
    pub content: Option<Vec<u8>>,
    /// Opaque version token (git blob sha)
    pub sha: String,
}

/// Result of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutReceipt {
    pub path: String,
    /// Token of the revision just written
    pub sha: String,
    pub commit_sha: Option<String>,
}

/// The trait all content store backends implement
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short backend name for logs
    fn backend_tag(&self) -> &'static str;

    /// Target and credential are present
    fn is_configured(&self) -> bool;

    /// Public URL of a committed file on the raw host
    fn raw_url(&self, path: &str) -> String;

    /// Current content and version token, `None` when the path does not exist
    async fn fetch_file(&self, path: &str) -> Result<Option<RemoteFile>, StoreError>;

    /// Create (`sha` absent) or overwrite (`sha` present) a file
    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<PutReceipt, StoreError>;

    /// Credential and reachability probe
    async fn check_access(&self) -> Result<bool, StoreError>;

    /// Raw bytes from the raw host, bypassing caches; `None` when absent
    async fn fetch_raw(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a file at `path`, overwriting whatever revision is there now
    async fn upsert_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<PutReceipt, StoreError> {
        let current = self.fetch_file(path).await?;
        let sha = current.as_ref().map(|f| f.sha.as_str());
        tracing::debug!(
            backend = self.backend_tag(),
            path,
            existing = sha.is_some(),
            "Writing file"
        );
        self.put_file(path, content, message, sha).await
    }
}
