//! One-step setup links
//!
//! An administrator shares a link whose fragment carries the store target
//! and credential: `{base}upload.html#setup={base64(json)}` with JSON
//! `{owner, repo, token, branch}`. Opening it configures the portal.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::{StoreConfig, DEFAULT_BRANCH};
use crate::error::{PortalError, Result};

pub const SETUP_FRAGMENT_PREFIX: &str = "#setup=";

/// Page the generated link points at
pub const SETUP_PAGE: &str = "upload.html";

#[derive(Debug, Serialize, Deserialize)]
struct SetupPayload {
    #[serde(default)]
    owner: String,
    #[serde(default)]
    repo: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    branch: Option<String>,
}

/// Build a setup link next to `base_url` (its last path segment is replaced)
pub fn generate(store: &StoreConfig, base_url: &str) -> Result<String> {
    if !store.is_configured() {
        return Err(PortalError::NotConfigured(
            "configure and save the repository first".to_string(),
        ));
    }

    let payload = SetupPayload {
        owner: store.owner.clone(),
        repo: store.repo.clone(),
        token: store.token.clone(),
        branch: Some(if store.branch.is_empty() {
            DEFAULT_BRANCH.to_string()
        } else {
            store.branch.clone()
        }),
    };
    let encoded = STANDARD.encode(serde_json::to_vec(&payload)?);

    let base = url::Url::parse(base_url)
        .map_err(|e| PortalError::Validation(format!("invalid base URL {base_url}: {e}")))?;
    let mut link = base
        .join(SETUP_PAGE)
        .map_err(|e| PortalError::Validation(format!("invalid base URL {base_url}: {e}")))?;
    link.set_query(None);
    link.set_fragment(Some(&format!("setup={encoded}")));
    Ok(link.to_string())
}

/// Extract a store target from a setup link or bare `#setup=` fragment
///
/// Anything else (no setup fragment, bad encoding, missing owner, repo or
/// token) yields `None`; a missing branch means `main`.
pub fn decode(link: &str) -> Option<StoreConfig> {
    let start = link.find('#')?;
    let encoded = link[start..].strip_prefix(SETUP_FRAGMENT_PREFIX)?;
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    let payload: SetupPayload = serde_json::from_slice(&bytes).ok()?;

    let store = StoreConfig::new(
        &payload.owner,
        &payload.repo,
        &payload.token,
        payload.branch.as_deref().unwrap_or(DEFAULT_BRANCH),
    );
    if store.is_configured() {
        Some(store)
    } else {
        tracing::debug!("Setup link is missing owner, repo or token");
        None
    }
}
