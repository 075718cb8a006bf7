//! In-memory content store
//!
//! Mirrors the contents API semantics (version tokens, create vs overwrite,
//! stale-write rejection) without a network. Used for dry runs and tests;
//! failures and concurrent writers can be injected.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{ContentStore, PutReceipt, RemoteFile};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    sha: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<String, StoredFile>,
    next_revision: u64,
    commits: Vec<String>,
    failing_paths: HashSet<String>,
    /// Writes applied by "someone else" right before our next put to a path
    concurrent_writes: HashMap<String, VecDeque<Vec<u8>>>,
    fetch_calls: u64,
}

impl MemoryState {
    fn write(&mut self, path: &str, content: Vec<u8>) -> String {
        self.next_revision += 1;
        let sha = format!("{:040x}", self.next_revision);
        self.files.insert(
            path.to_string(),
            StoredFile {
                content,
                sha: sha.clone(),
            },
        );
        sha
    }
}

/// Content store held entirely in memory
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    configured: bool,
    credential_valid: bool,
    raw_base: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            configured: true,
            credential_valid: true,
            raw_base: "memory://portal/main".to_string(),
        }
    }

    /// Store that reports a missing target/credential
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Store whose credential is rejected by the access probe
    pub fn with_invalid_credential() -> Self {
        Self {
            credential_valid: false,
            ..Self::new()
        }
    }

    /// Raw URLs are built on this base instead of `memory://portal/main`
    pub fn with_raw_base(mut self, raw_base: impl Into<String>) -> Self {
        self.raw_base = raw_base.into();
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a file as if it had been committed earlier
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) -> String {
        self.state().write(path, content.into())
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).map(|f| f.content.clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state().files.contains_key(path)
    }

    /// Sorted list of stored paths
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state().files.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Paths of successful writes, in commit order
    pub fn commits(&self) -> Vec<String> {
        self.state().commits.clone()
    }

    pub fn fetch_calls(&self) -> u64 {
        self.state().fetch_calls
    }

    /// Every put to `path` fails with a server error
    pub fn fail_puts_to(&self, path: &str) {
        self.state().failing_paths.insert(path.to_string());
    }

    /// Another writer commits `content` to `path` just before our next put there
    pub fn queue_concurrent_write(&self, path: &str, content: impl Into<Vec<u8>>) {
        self.state()
            .concurrent_writes
            .entry(path.to_string())
            .or_default()
            .push_back(content.into());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn raw_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.raw_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn fetch_file(&self, path: &str) -> Result<Option<RemoteFile>, StoreError> {
        let mut state = self.state();
        state.fetch_calls += 1;
        Ok(state.files.get(path).map(|f| RemoteFile {
            path: path.to_string(),
            content: Some(f.content.clone()),
            sha: f.sha.clone(),
        }))
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<PutReceipt, StoreError> {
        let mut state = self.state();

        if state.failing_paths.contains(path) {
            return Err(StoreError::Remote {
                status: 500,
                message: format!("injected failure for {path}"),
            });
        }

        let concurrent = state
            .concurrent_writes
            .get_mut(path)
            .and_then(|queue| queue.pop_front());
        if let Some(other) = concurrent {
            state.write(path, other);
        }

        let current = state.files.get(path).map(|f| f.sha.clone());
        match (current.as_deref(), sha) {
            (Some(current), Some(given)) if current != given => {
                return Err(StoreError::Conflict {
                    path: path.to_string(),
                    message: format!("{path} is at {current} but expected {given}"),
                });
            }
            (Some(_), None) => {
                return Err(StoreError::Remote {
                    status: 422,
                    message: "Invalid request. \"sha\" wasn't supplied.".to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(StoreError::Conflict {
                    path: path.to_string(),
                    message: format!("{path} no longer exists"),
                });
            }
            _ => {}
        }

        let new_sha = state.write(path, content.to_vec());
        state.commits.push(path.to_string());
        tracing::debug!(path, message, "Committed file in memory");

        Ok(PutReceipt {
            path: path.to_string(),
            sha: new_sha,
            commit_sha: None,
        })
    }

    async fn check_access(&self) -> Result<bool, StoreError> {
        Ok(self.configured && self.credential_valid)
    }

    async fn fetch_raw(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(path))
    }
}
