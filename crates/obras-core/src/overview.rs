//! Dashboard and gallery views over the catalog and the manifest
//!
//! Static project data is the base; the manifest record, when present,
//! supplies status, images and the last-update date.

use chrono::NaiveDate;

use crate::manifest::{ManifestDocument, ProjectRecord};
use crate::project::{Project, ProjectCatalog, ProjectStatus};
use crate::upload::MAX_PROGRESS_PHOTOS;

/// Image slots per project: one cover plus the progress photos
pub const IMAGE_SLOTS: usize = MAX_PROGRESS_PHOTOS + 1;

/// What the portal shows for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOverview {
    pub project: Project,
    pub status: ProjectStatus,
    pub cover_url: Option<String>,
    pub progress_urls: Vec<String>,
    pub total_images: usize,
    /// Share of image slots filled, rounded
    pub percent: u8,
    pub last_updated: Option<NaiveDate>,
}

impl ProjectOverview {
    pub fn new(project: &Project, record: Option<&ProjectRecord>) -> Self {
        let cover_url = record.and_then(|r| r.cover_url.clone());
        let progress_urls = record.map(|r| r.progress_urls.clone()).unwrap_or_default();
        let total_images = usize::from(cover_url.is_some()) + progress_urls.len();
        let percent = ((total_images as f64 / IMAGE_SLOTS as f64) * 100.0).round() as u8;

        Self {
            project: project.clone(),
            status: record
                .and_then(|r| r.status.known())
                .unwrap_or(project.status),
            cover_url,
            progress_urls,
            total_images,
            percent,
            last_updated: record.and_then(|r| r.last_updated),
        }
    }
}

/// Dashboard: every catalog project plus counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub projects: Vec<ProjectOverview>,
    pub in_progress: usize,
    pub completed: usize,
    pub without_images: usize,
}

impl DashboardSummary {
    pub fn build(catalog: &ProjectCatalog, manifest: Option<&ManifestDocument>) -> Self {
        let projects: Vec<ProjectOverview> = catalog
            .iter()
            .map(|p| ProjectOverview::new(p, manifest.and_then(|m| m.record(p.id))))
            .collect();

        let count = |status| projects.iter().filter(|o| o.status == status).count();
        let in_progress = count(ProjectStatus::InProgress);
        let completed = count(ProjectStatus::Completed);
        let without_images = projects.iter().filter(|o| o.total_images == 0).count();

        Self {
            projects,
            in_progress,
            completed,
            without_images,
        }
    }

    pub fn total_projects(&self) -> usize {
        self.projects.len()
    }

    /// Projects with the given status, or all of them
    pub fn filtered(&self, status: Option<ProjectStatus>) -> impl Iterator<Item = &ProjectOverview> {
        self.projects
            .iter()
            .filter(move |o| status.map_or(true, |s| o.status == s))
    }
}

/// `dd/mm/yyyy`, or a dash when unknown
pub fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None => "—".to_string(),
    }
}
