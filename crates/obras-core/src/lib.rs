//! Obras Core - construction-site photo portal
//!
//! Field engineers upload site photos straight into a GitHub repository;
//! a JSON manifest in the same repository lists each project's images.
//!
//! - **Store**: path-addressed content store with version tokens (GitHub contents API, in-memory)
//! - **Manifest**: the shared `data/obras.json` document and its repository
//! - **Upload**: upload session, remote path convention and the upload pipeline
//! - **Project**: static catalog of construction sites
//! - **Overview**: dashboard and gallery views
//! - **Setup link**: one-step configuration links
//! - **Config**: TOML configuration for store target, credential and upload policy
//!
//! # Upload flow
//!
//! ```text
//! Idle → Validating → UploadingCover → UploadingProgressPhotos → SyncingManifest → Done
//!                                                                                → Failed
//! ```
//!
//! Uploads run one at a time in staging order. The manifest is rewritten
//! whole after every image is committed; a failure part-way leaves the
//! committed images in place and the manifest untouched.

pub mod config;
pub mod error;
pub mod manifest;
pub mod overview;
pub mod project;
pub mod setup_link;
pub mod store;
pub mod upload;

pub use config::{ConflictPolicy, PortalConfig, StoreConfig, UploadConfig};
pub use error::{ConfigError, PortalError, Result, StoreError};
pub use manifest::{
    ManifestDocument, ManifestRepository, ProjectRecord, RecordStatus, MANIFEST_PATH,
};
pub use overview::{format_date, DashboardSummary, ProjectOverview};
pub use project::{Project, ProjectCatalog, ProjectId, ProjectStatus};
pub use store::{ContentStore, GithubStore, MemoryStore, PutReceipt, RemoteFile};
pub use upload::{
    ProgressReporter, ProgressUpdate, SilentProgress, StagedFile, UploadOrchestrator,
    UploadPhase, UploadReport, UploadSession, MAX_PROGRESS_PHOTOS,
};

/// Returns the version of obras-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
