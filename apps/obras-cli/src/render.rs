//! Terminal rendering with comfy-table

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use obras_core::overview::IMAGE_SLOTS;
use obras_core::{format_date, DashboardSummary, ProjectOverview, ProjectStatus, UploadReport};

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn dashboard(summary: &DashboardSummary, filter: Option<ProjectStatus>) -> Table {
    let mut table = table();
    table.set_header(vec![
        "#", "Code", "Name", "Location", "Status", "Images", "Filled", "Updated",
    ]);
    for overview in summary.filtered(filter) {
        let project = &overview.project;
        table.add_row(vec![
            project.id.to_string(),
            project.code.clone(),
            project.name.clone(),
            project.location.clone(),
            overview.status.label().to_string(),
            format!("{}/{}", overview.total_images, IMAGE_SLOTS),
            format!("{}%", overview.percent),
            format_date(overview.last_updated),
        ]);
    }
    table
}

pub fn gallery(overview: &ProjectOverview) -> String {
    let project = &overview.project;
    let mut out = format!(
        "{} - {}\n{}\nStatus: {}   Images: {}/{}   Updated: {}\n",
        project.code,
        project.name,
        project.location,
        overview.status,
        overview.total_images,
        IMAGE_SLOTS,
        format_date(overview.last_updated)
    );

    let mut table = table();
    table.set_header(vec!["Image", "URL"]);
    table.add_row(vec![
        "Cover".to_string(),
        overview
            .cover_url
            .clone()
            .unwrap_or_else(|| "(none)".to_string()),
    ]);
    for (i, url) in overview.progress_urls.iter().enumerate() {
        table.add_row(vec![format!("Photo {}", i + 1), url.clone()]);
    }
    out.push_str(&table.to_string());
    out
}

pub fn upload_report(report: &UploadReport) -> String {
    let record = &report.record;
    format!(
        "Project {}: {} image(s) uploaded, {} in manifest, status {}",
        report.project, report.uploaded, record.total_image_count, record.status
    )
}
