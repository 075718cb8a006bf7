//! Upload pipeline: cover, progress photos, then manifest sync
//!
//! All remote calls are awaited one after another. A failure aborts the
//! remaining steps; files already committed stay in the store and the
//! manifest is only written once every image made it.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::paths::{cover_path, progress_path};
use super::phase::UploadPhase;
use super::session::UploadSession;
use crate::config::{ConflictPolicy, UploadConfig};
use crate::error::{PortalError, Result};
use crate::manifest::{ManifestRepository, ProjectRecord, UploadMerge};
use crate::project::{Project, ProjectCatalog, ProjectId};
use crate::store::ContentStore;

/// Progress milestones, in percent
const PCT_START: u8 = 5;
const PCT_COVER_START: u8 = 15;
const PCT_COVER_DONE: u8 = 30;
const PCT_PHOTOS_NO_COVER: u8 = 10;
const PCT_PHOTOS_END: u8 = 90;
const PCT_SYNC: u8 = 92;
const PCT_DONE: u8 = 100;

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub phase: UploadPhase,
    pub percent: u8,
    pub message: String,
}

/// Receives progress notifications for user feedback
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: &ProgressUpdate);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Discards progress notifications
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn report(&self, _update: &ProgressUpdate) {}
}

/// Outcome of a successful upload operation
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    pub project: ProjectId,
    pub cover_url: Option<String>,
    /// URLs of the progress photos written in this operation, in order
    pub progress_urls: Vec<String>,
    /// Number of image files committed
    pub uploaded: usize,
    /// The project's manifest record as saved
    pub record: ProjectRecord,
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Drives an [`UploadSession`] through the upload state machine
pub struct UploadOrchestrator {
    store: Arc<dyn ContentStore>,
    manifest: ManifestRepository,
    catalog: ProjectCatalog,
    config: UploadConfig,
    clock: Clock,
}

impl UploadOrchestrator {
    pub fn new(store: Arc<dyn ContentStore>, catalog: ProjectCatalog, config: UploadConfig) -> Self {
        Self {
            manifest: ManifestRepository::new(store.clone()),
            store,
            catalog,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock used for dates and commit messages
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn catalog(&self) -> &ProjectCatalog {
        &self.catalog
    }

    /// Run one upload operation for the session
    ///
    /// Pre-flight problems (store not configured, no project, nothing
    /// staged) are returned without any remote call and leave the session
    /// idle. Any later error leaves it `Failed` with its files still staged
    /// so it can be resubmitted.
    pub async fn run(
        &self,
        session: &mut UploadSession,
        progress: &dyn ProgressReporter,
    ) -> Result<UploadReport> {
        if session.phase() == UploadPhase::Failed {
            session.transition(UploadPhase::Idle)?;
        }
        session.transition(UploadPhase::Validating)?;

        let project = match self.preflight(session) {
            Ok(project) => project.clone(),
            Err(e) => {
                session.transition(UploadPhase::Idle)?;
                return Err(e);
            }
        };

        tracing::info!(
            project = %project.id,
            files = session.staged_count(),
            "Starting upload"
        );
        notify(progress, session.phase(), PCT_START, "Preparing upload...");

        match self.execute(session, &project, progress).await {
            Ok(report) => {
                session.transition(UploadPhase::Done)?;
                notify(
                    progress,
                    UploadPhase::Done,
                    PCT_DONE,
                    &format!("{} image(s) uploaded successfully", report.uploaded),
                );
                tracing::info!(project = %project.id, uploaded = report.uploaded, "Upload finished");
                Ok(report)
            }
            Err(e) => {
                if let Err(t) = session.transition(UploadPhase::Failed) {
                    tracing::warn!("Could not mark upload failed: {}", t);
                }
                notify(progress, UploadPhase::Failed, 0, "");
                tracing::error!(project = %project.id, "Upload failed: {}", e);
                Err(e)
            }
        }
    }

    fn preflight(&self, session: &UploadSession) -> Result<&Project> {
        if !self.store.is_configured() {
            return Err(PortalError::NotConfigured(
                "configure the GitHub owner, repository and token first".to_string(),
            ));
        }
        let id = session.project().ok_or_else(|| {
            PortalError::Validation("select a project before uploading".to_string())
        })?;
        let project = self
            .catalog
            .get(id)
            .ok_or_else(|| PortalError::Validation(format!("unknown project {id}")))?;
        if !session.has_files() {
            return Err(PortalError::Validation(
                "select at least one image to upload".to_string(),
            ));
        }
        Ok(project)
    }

    async fn execute(
        &self,
        session: &mut UploadSession,
        project: &Project,
        progress: &dyn ProgressReporter,
    ) -> Result<UploadReport> {
        let mut merge = UploadMerge::default();
        let mut uploaded = 0;
        let has_cover = session.cover().is_some();
        let photo_count = session.progress().len();

        if has_cover {
            session.transition(UploadPhase::UploadingCover)?;
            if let Some(cover) = session.cover() {
                let path = cover_path(project.id, &cover.name);
                notify(progress, UploadPhase::UploadingCover, PCT_COVER_START, "Uploading cover...");
                self.upload_image(&path, &cover.bytes).await?;
                merge.cover_url = Some(self.store.raw_url(&path));
                uploaded += 1;
                notify(progress, UploadPhase::UploadingCover, PCT_COVER_DONE, "Cover uploaded");
            }
        }

        if photo_count > 0 {
            session.transition(UploadPhase::UploadingProgressPhotos)?;
            let start = if has_cover { PCT_COVER_DONE } else { PCT_PHOTOS_NO_COVER };
            let per_file = f64::from(PCT_PHOTOS_END - start) / photo_count as f64;

            for (i, file) in session.progress().iter().enumerate() {
                let path = progress_path(project.id, i + 1, &file.name);
                let percent = start + (per_file * i as f64).floor() as u8;
                notify(
                    progress,
                    UploadPhase::UploadingProgressPhotos,
                    percent,
                    &format!("Uploading photo {} of {}...", i + 1, photo_count),
                );
                self.upload_image(&path, &file.bytes).await?;
                merge.progress_urls.push(self.store.raw_url(&path));
                uploaded += 1;
            }
        }

        session.transition(UploadPhase::SyncingManifest)?;
        notify(progress, UploadPhase::SyncingManifest, PCT_SYNC, "Updating image manifest...");
        let record = self.sync_manifest(project, &merge).await?;

        Ok(UploadReport {
            project: project.id,
            cover_url: merge.cover_url,
            progress_urls: merge.progress_urls,
            uploaded,
            record,
        })
    }

    async fn upload_image(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let message = format!("[Portal] Upload image: {path}");
        self.store.upsert_file(path, bytes, &message).await?;
        Ok(())
    }

    /// Read-modify-write of the manifest, honoring the conflict policy
    async fn sync_manifest(&self, project: &Project, merge: &UploadMerge) -> Result<ProjectRecord> {
        let attempts = match self.config.conflict {
            ConflictPolicy::Fail => 1,
            ConflictPolicy::ReloadAndRetry => 1 + self.config.max_conflict_retries,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = (self.clock)();
            let mut doc = self.manifest.load_or_bootstrap(&self.catalog, now).await?;
            let record = doc.apply_upload(project, merge, now).clone();

            match self.manifest.save(&mut doc, now).await {
                Ok(_) => return Ok(record),
                Err(PortalError::Store(e)) if e.is_conflict() && attempt < attempts => {
                    tracing::warn!(attempt, "Manifest changed while saving, reloading: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn notify(progress: &dyn ProgressReporter, phase: UploadPhase, percent: u8, message: &str) {
    progress.report(&ProgressUpdate {
        phase,
        percent,
        message: message.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ManifestDocument, MANIFEST_PATH};
    use crate::project::ProjectStatus;
    use crate::store::MemoryStore;
    use crate::upload::session::StagedFile;
    use std::sync::Mutex;

    fn orchestrator(store: Arc<MemoryStore>) -> UploadOrchestrator {
        UploadOrchestrator::new(store, ProjectCatalog::builtin(), UploadConfig::default())
    }

    fn manifest_in(store: &MemoryStore) -> ManifestDocument {
        ManifestDocument::from_json(&store.get(MANIFEST_PATH).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn unconfigured_store_is_rejected_before_any_call() {
        let store = Arc::new(MemoryStore::unconfigured());
        let orch = orchestrator(store.clone());
        let mut session = UploadSession::for_project(ProjectId(1));
        session.stage_progress([StagedFile::new("a.jpg", vec![1])]);

        let err = orch.run(&mut session, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, PortalError::NotConfigured(_)));
        assert_eq!(session.phase(), UploadPhase::Idle);
        assert_eq!(store.fetch_calls(), 0);
        assert!(store.commits().is_empty());
    }

    #[tokio::test]
    async fn missing_project_or_files_is_a_validation_error() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store.clone());

        let mut no_project = UploadSession::new();
        no_project.stage_progress([StagedFile::new("a.jpg", vec![1])]);
        let err = orch.run(&mut no_project, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));

        let mut no_files = UploadSession::for_project(ProjectId(1));
        let err = orch.run(&mut no_files, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));

        let mut unknown = UploadSession::for_project(ProjectId(99));
        unknown.stage_progress([StagedFile::new("a.jpg", vec![1])]);
        let err = orch.run(&mut unknown, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));

        assert_eq!(store.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_ends_at_100() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store);
        let mut session = UploadSession::for_project(ProjectId(2));
        session.set_cover(Some(StagedFile::new("capa.jpg", vec![0])));
        session.stage_progress((0..4u8).map(|i| StagedFile::new(format!("{i}.jpg"), vec![i])));

        let seen = Mutex::new(Vec::new());
        let reporter = |u: &ProgressUpdate| seen.lock().unwrap().push(u.percent);
        orch.run(&mut session, &reporter).await.unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.first(), Some(&5));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert!(seen.contains(&92));
    }

    #[tokio::test]
    async fn failure_resets_progress_and_keeps_files() {
        let store = Arc::new(MemoryStore::new());
        store.fail_puts_to("images/obra-01/img-01.jpg");
        let orch = orchestrator(store);
        let mut session = UploadSession::for_project(ProjectId(1));
        session.stage_progress([StagedFile::new("a.jpg", vec![1])]);

        let last = Mutex::new(None);
        let reporter = |u: &ProgressUpdate| *last.lock().unwrap() = Some(u.clone());
        let err = orch.run(&mut session, &reporter).await.unwrap_err();

        assert!(err.to_string().contains("injected failure"));
        assert_eq!(session.phase(), UploadPhase::Failed);
        assert_eq!(session.progress().len(), 1);
        let last = last.into_inner().unwrap().unwrap();
        assert_eq!(last.phase, UploadPhase::Failed);
        assert_eq!(last.percent, 0);
    }

    #[tokio::test]
    async fn done_session_must_be_cleared_before_reuse() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store);
        let mut session = UploadSession::for_project(ProjectId(1));
        session.stage_progress([StagedFile::new("a.jpg", vec![1])]);
        orch.run(&mut session, &SilentProgress).await.unwrap();
        assert_eq!(session.phase(), UploadPhase::Done);

        assert!(orch.run(&mut session, &SilentProgress).await.is_err());
        session.clear();
        session.stage_progress([StagedFile::new("b.jpg", vec![2])]);
        orch.run(&mut session, &SilentProgress).await.unwrap();
    }

    #[tokio::test]
    async fn conflict_fails_by_default() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store.clone());
        let mut seed = ManifestDocument::bootstrap(ProjectCatalog::builtin().iter(), Utc::now());
        store.insert(MANIFEST_PATH, seed.to_json().unwrap());
        seed.records[4].status = ProjectStatus::Completed.into();
        store.queue_concurrent_write(MANIFEST_PATH, seed.to_json().unwrap());

        let mut session = UploadSession::for_project(ProjectId(1));
        session.stage_progress([StagedFile::new("a.jpg", vec![1])]);
        let err = orch.run(&mut session, &SilentProgress).await.unwrap_err();

        assert!(matches!(err, PortalError::Store(ref e) if e.is_conflict()));
        assert_eq!(session.phase(), UploadPhase::Failed);
        // The other writer's version survives untouched
        let doc = manifest_in(&store);
        assert_eq!(doc.record(ProjectId(5)).unwrap().status, ProjectStatus::Completed);
        assert_eq!(doc.record(ProjectId(1)).unwrap().total_image_count, 0);
    }

    #[tokio::test]
    async fn conflict_retry_reloads_and_merges() {
        let store = Arc::new(MemoryStore::new());
        let config = UploadConfig {
            conflict: ConflictPolicy::ReloadAndRetry,
            max_conflict_retries: 2,
        };
        let orch = UploadOrchestrator::new(store.clone(), ProjectCatalog::builtin(), config);

        let mut seed = ManifestDocument::bootstrap(ProjectCatalog::builtin().iter(), Utc::now());
        store.insert(MANIFEST_PATH, seed.to_json().unwrap());
        seed.records[4].status = ProjectStatus::Completed.into();
        store.queue_concurrent_write(MANIFEST_PATH, seed.to_json().unwrap());

        let mut session = UploadSession::for_project(ProjectId(1));
        session.stage_progress([StagedFile::new("a.jpg", vec![1])]);
        orch.run(&mut session, &SilentProgress).await.unwrap();

        let doc = manifest_in(&store);
        assert_eq!(doc.record(ProjectId(5)).unwrap().status, ProjectStatus::Completed);
        assert_eq!(doc.record(ProjectId(1)).unwrap().total_image_count, 1);
    }
}
