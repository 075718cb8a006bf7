//! Command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use obras_core::{
    setup_link, ContentStore, DashboardSummary, GithubStore, ManifestDocument,
    ManifestRepository, MemoryStore, PortalConfig, PortalError, ProgressUpdate, ProjectId,
    ProjectOverview, ProjectStatus, StagedFile, StoreConfig, UploadOrchestrator, UploadReport,
    UploadSession, MANIFEST_PATH, MAX_PROGRESS_PHOTOS,
};

use crate::render;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub async fn configure(
    path: &Path,
    owner: &str,
    repo: &str,
    token: &str,
    branch: &str,
    check: bool,
) -> CliResult {
    let mut config = PortalConfig::load(path)?;
    let store = StoreConfig::new(owner, repo, token, branch);
    if let Some(field) = store.missing_field() {
        return Err(PortalError::Validation(format!("{field} must not be empty")).into());
    }
    replace_target(&mut config, store);
    save(&config, path, check).await
}

pub async fn check(path: &Path) -> CliResult {
    let config = PortalConfig::load(path)?;
    println!("obras-core {}", obras_core::version());
    if let Some(field) = config.store.missing_field() {
        return Err(PortalError::NotConfigured(format!(
            "{field} is missing in {}",
            path.display()
        ))
        .into());
    }
    verify_access(&config.store).await
}

pub async fn status(path: &Path, filter: Option<ProjectStatus>) -> CliResult {
    let config = PortalConfig::load(path)?;
    let manifest = load_manifest(&config).await?;
    let summary = DashboardSummary::build(&config.catalog(), manifest.as_ref());

    println!("{}", render::dashboard(&summary, filter));
    println!(
        "{} projects, {} in progress, {} completed, {} without images",
        summary.total_projects(),
        summary.in_progress,
        summary.completed,
        summary.without_images
    );
    Ok(())
}

pub async fn show(path: &Path, id: ProjectId) -> CliResult {
    let config = PortalConfig::load(path)?;
    let catalog = config.catalog();
    let project = catalog
        .get(id)
        .ok_or_else(|| PortalError::Validation(format!("unknown project {id}")))?;
    let manifest = load_manifest(&config).await?;
    let overview = ProjectOverview::new(project, manifest.as_ref().and_then(|m| m.record(id)));

    println!("{}", render::gallery(&overview));
    Ok(())
}

pub async fn upload(
    path: &Path,
    project: ProjectId,
    cover: Option<PathBuf>,
    photos: Vec<PathBuf>,
    dry_run: bool,
) -> CliResult {
    let config = PortalConfig::load(path)?;

    let mut session = UploadSession::for_project(project);
    if let Some(cover) = cover {
        session.set_cover(Some(StagedFile::from_path(cover)?));
    }
    let staged = photos
        .iter()
        .map(StagedFile::from_path)
        .collect::<Result<Vec<_>, _>>()?;
    let offered = staged.len();
    let kept = session.stage_progress(staged);
    if kept < offered {
        println!(
            "Only {MAX_PROGRESS_PHOTOS} progress photos per upload; {} ignored",
            offered - kept
        );
    }

    let report = if dry_run {
        let memory = Arc::new(dry_run_store(&config.store).await?);
        let report = run_upload(memory.clone(), &config, &mut session).await?;
        println!("Dry run, nothing was written. Would commit:");
        for path in memory.commits() {
            println!("  {path}");
        }
        report
    } else {
        let store = Arc::new(GithubStore::new(config.store.clone())?);
        run_upload(store, &config, &mut session).await?
    };

    println!("{}", render::upload_report(&report));
    Ok(())
}

pub fn generate_setup_link(path: &Path, base_url: &str) -> CliResult {
    let config = PortalConfig::load(path)?;
    let link = setup_link::generate(&config.store, base_url)?;
    println!("{link}");
    println!("Anyone with this link can write to {}/{}.", config.store.owner, config.store.repo);
    Ok(())
}

pub async fn apply_setup_link(path: &Path, link: &str, check: bool) -> CliResult {
    let store = setup_link::decode(link)
        .ok_or_else(|| PortalError::Validation("not a valid setup link".to_string()))?;
    let mut config = PortalConfig::load(path)?;
    replace_target(&mut config, store);
    save(&config, path, check).await
}

/// Swap owner, repository, credential and branch; keep hosts and timeout
fn replace_target(config: &mut PortalConfig, target: StoreConfig) {
    config.store = StoreConfig {
        api_base: std::mem::take(&mut config.store.api_base),
        raw_base: std::mem::take(&mut config.store.raw_base),
        timeout_secs: config.store.timeout_secs,
        ..target
    };
}

async fn save(config: &PortalConfig, path: &Path, check: bool) -> CliResult {
    config.validate()?;
    config.save(path)?;
    println!("Saved configuration to {}", path.display());
    if check {
        verify_access(&config.store).await?;
    }
    Ok(())
}

async fn verify_access(store: &StoreConfig) -> CliResult {
    let github = GithubStore::new(store.clone())?;
    if github.check_access().await? {
        println!(
            "Connected to {}/{} (branch {})",
            store.owner, store.repo, store.branch
        );
        Ok(())
    } else {
        Err(format!(
            "cannot access {}/{}: check the repository name and token",
            store.owner, store.repo
        )
        .into())
    }
}

async fn load_manifest(config: &PortalConfig) -> Result<Option<ManifestDocument>, PortalError> {
    if !config.store.is_configured() {
        tracing::warn!("Store not configured, showing catalog defaults");
        return Ok(None);
    }
    let store = GithubStore::new(config.store.clone())?;
    ManifestRepository::new(Arc::new(store)).load().await
}

/// In-memory store seeded with the current remote manifest, when reachable
async fn dry_run_store(target: &StoreConfig) -> Result<MemoryStore, PortalError> {
    let memory = MemoryStore::new().with_raw_base(target.raw_base_url());
    if target.is_configured() {
        let github = GithubStore::new(target.clone())?;
        if let Some(bytes) = github.fetch_raw(MANIFEST_PATH).await? {
            memory.insert(MANIFEST_PATH, bytes);
        }
    }
    Ok(memory)
}

async fn run_upload(
    store: Arc<dyn ContentStore>,
    config: &PortalConfig,
    session: &mut UploadSession,
) -> Result<UploadReport, PortalError> {
    let orchestrator = UploadOrchestrator::new(store, config.catalog(), config.upload.clone());
    orchestrator.run(session, &print_progress).await
}

fn print_progress(update: &ProgressUpdate) {
    if !update.message.is_empty() {
        println!("[{:>3}%] {}", update.percent, update.message);
    }
}
