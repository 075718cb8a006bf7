//! Upload operation state machine
//!
//! State transitions:
//! ```text
//! Idle → Validating → UploadingCover → UploadingProgressPhotos → SyncingManifest → Done
//!          ↓    ↘___________________↗           ↓                       ↓
//!        Idle     (no cover staged)           Failed                  Failed
//! ```
//! `Validating → Idle` is a pre-flight rejection. `Done` and `Failed` return
//! to `Idle`.

use serde::{Deserialize, Serialize};

/// Phase of one upload operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadPhase {
    /// Nothing in flight; files may be staged
    Idle,
    /// Checking preconditions, no remote calls yet
    Validating,
    /// Writing the cover image
    UploadingCover,
    /// Writing progress photos in staging order
    UploadingProgressPhotos,
    /// Read-modify-write of the manifest
    SyncingManifest,
    /// Manifest saved
    Done,
    /// Aborted after at least one remote call
    Failed,
}

impl UploadPhase {
    /// Check if a phase transition is valid
    pub fn can_transition_to(&self, target: &UploadPhase) -> bool {
        use UploadPhase::*;
        match (self, target) {
            (Idle, Validating) => true,

            // Pre-flight rejection, or start uploading
            (Validating, Idle) => true,
            (Validating, UploadingCover) => true,
            (Validating, UploadingProgressPhotos) => true,

            (UploadingCover, UploadingProgressPhotos) => true,
            (UploadingCover, SyncingManifest) => true,
            (UploadingCover, Failed) => true,

            (UploadingProgressPhotos, SyncingManifest) => true,
            (UploadingProgressPhotos, Failed) => true,

            (SyncingManifest, Done) => true,
            (SyncingManifest, Failed) => true,

            (Done, Idle) => true,
            (Failed, Idle) => true,

            _ => false,
        }
    }

    /// Check if the operation has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadPhase::Done | UploadPhase::Failed)
    }

    /// Remote calls are being made
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            UploadPhase::UploadingCover
                | UploadPhase::UploadingProgressPhotos
                | UploadPhase::SyncingManifest
        )
    }

    /// Get a human-readable description of the phase
    pub fn description(&self) -> &'static str {
        match self {
            UploadPhase::Idle => "Waiting for files",
            UploadPhase::Validating => "Checking upload preconditions",
            UploadPhase::UploadingCover => "Uploading cover image",
            UploadPhase::UploadingProgressPhotos => "Uploading progress photos",
            UploadPhase::SyncingManifest => "Updating image manifest",
            UploadPhase::Done => "Upload finished",
            UploadPhase::Failed => "Upload failed",
        }
    }
}

impl Default for UploadPhase {
    fn default() -> Self {
        UploadPhase::Idle
    }
}

impl std::fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UploadPhase::Idle => "IDLE",
            UploadPhase::Validating => "VALIDATING",
            UploadPhase::UploadingCover => "UPLOADING_COVER",
            UploadPhase::UploadingProgressPhotos => "UPLOADING_PROGRESS_PHOTOS",
            UploadPhase::SyncingManifest => "SYNCING_MANIFEST",
            UploadPhase::Done => "DONE",
            UploadPhase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}
