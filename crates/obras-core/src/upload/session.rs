//! Upload session: selection, staged files and the operation phase

use std::path::Path;

use super::phase::UploadPhase;
use crate::error::{PortalError, Result};
use crate::project::ProjectId;

/// Most progress photos that can be staged at once
pub const MAX_PROGRESS_PHOTOS: usize = 18;

/// A local file waiting to be uploaded
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Original file name; only its extension reaches the remote path
    pub name: String,
    pub bytes: Vec<u8>,
}

impl StagedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping its file name
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| PortalError::Io(format!("{}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Everything one upload operation needs, owned by the caller
#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    project: Option<ProjectId>,
    cover: Option<StagedFile>,
    progress: Vec<StagedFile>,
    phase: UploadPhase,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_project(project: ProjectId) -> Self {
        Self {
            project: Some(project),
            ..Self::default()
        }
    }

    pub fn select_project(&mut self, project: Option<ProjectId>) {
        self.project = project;
    }

    pub fn project(&self) -> Option<ProjectId> {
        self.project
    }

    /// Stage (or unstage) the cover image
    pub fn set_cover(&mut self, cover: Option<StagedFile>) {
        self.cover = cover;
    }

    pub fn cover(&self) -> Option<&StagedFile> {
        self.cover.as_ref()
    }

    /// Stage progress photos in order; files beyond the cap are dropped
    ///
    /// Returns how many of the given files were kept.
    pub fn stage_progress(&mut self, files: impl IntoIterator<Item = StagedFile>) -> usize {
        let room = MAX_PROGRESS_PHOTOS.saturating_sub(self.progress.len());
        let before = self.progress.len();
        self.progress.extend(files.into_iter().take(room));
        self.progress.len() - before
    }

    /// Unstage one progress photo; later photos move up one place
    pub fn remove_progress(&mut self, index: usize) -> Option<StagedFile> {
        if index < self.progress.len() {
            Some(self.progress.remove(index))
        } else {
            None
        }
    }

    pub fn progress(&self) -> &[StagedFile] {
        &self.progress
    }

    /// Cover (if any) plus progress photos
    pub fn staged_count(&self) -> usize {
        usize::from(self.cover.is_some()) + self.progress.len()
    }

    pub fn has_files(&self) -> bool {
        self.staged_count() > 0
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    /// Move to `target`, rejecting transitions the state machine forbids
    pub fn transition(&mut self, target: UploadPhase) -> Result<()> {
        if !self.phase.can_transition_to(&target) {
            return Err(PortalError::Validation(format!(
                "invalid upload transition {} -> {}",
                self.phase, target
            )));
        }
        tracing::debug!(from = %self.phase, to = %target, "Upload phase");
        self.phase = target;
        Ok(())
    }

    /// Drop staged files and return to idle; the project stays selected
    pub fn clear(&mut self) {
        self.cover = None;
        self.progress.clear();
        self.phase = UploadPhase::Idle;
    }
}
