//! Load and save the shared manifest through a content store

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use super::{ManifestDocument, MANIFEST_PATH};
use crate::error::{PortalError, Result};
use crate::project::ProjectCatalog;
use crate::store::{ContentStore, PutReceipt};

/// Reads and rewrites `data/obras.json`
pub struct ManifestRepository {
    store: Arc<dyn ContentStore>,
}

impl ManifestRepository {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Fetch the current document, always bypassing caches
    ///
    /// Returns `None` when the document does not exist yet, cannot be
    /// reached, or the store is not configured; those are logged so a first
    /// run can bootstrap. A document that exists but cannot be parsed is an
    /// error and is never bootstrapped over.
    pub async fn load(&self) -> Result<Option<ManifestDocument>> {
        if !self.store.is_configured() {
            tracing::debug!("Store not configured, no manifest to load");
            return Ok(None);
        }

        let bytes = match self.store.fetch_raw(MANIFEST_PATH).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::info!("Manifest {} does not exist yet", MANIFEST_PATH);
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!("Failed to fetch manifest: {}", e);
                return Ok(None);
            }
        };

        ManifestDocument::from_json(&bytes).map(Some).map_err(|e| {
            PortalError::Manifest(format!("{MANIFEST_PATH} cannot be read: {e}"))
        })
    }

    /// Fresh document for every project in the catalog
    pub fn bootstrap(catalog: &ProjectCatalog, now: DateTime<Utc>) -> ManifestDocument {
        ManifestDocument::bootstrap(catalog.iter(), now)
    }

    /// Load the document, or bootstrap one when it is absent
    pub async fn load_or_bootstrap(
        &self,
        catalog: &ProjectCatalog,
        now: DateTime<Utc>,
    ) -> Result<ManifestDocument> {
        match self.load().await? {
            Some(doc) => Ok(doc),
            None => Ok(Self::bootstrap(catalog, now)),
        }
    }

    /// Rewrite the whole document
    ///
    /// Totals are recomputed first. The version token is fetched right
    /// before the write; a concurrent writer in between surfaces as a
    /// conflict from the store.
    pub async fn save(&self, doc: &mut ManifestDocument, now: DateTime<Utc>) -> Result<PutReceipt> {
        doc.normalize();
        let json = doc.to_json()?;

        let message = format!(
            "[Portal] Update obras.json — {}",
            now.to_rfc3339_opts(SecondsFormat::Millis, true)
        );

        let receipt = self
            .store
            .upsert_file(MANIFEST_PATH, json.as_bytes(), &message)
            .await?;

        tracing::info!(
            records = doc.records.len(),
            "Saved manifest {}",
            MANIFEST_PATH
        );
        Ok(receipt)
    }
}
