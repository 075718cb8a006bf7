//! Shared manifest document (`data/obras.json`)
//!
//! The document lists one record per project with its cover URL, ordered
//! progress-photo URLs, status and last-update date. It is always rewritten
//! whole; field names follow the published JSON layout consumed by the
//! reporting side.

pub mod repository;

pub use repository::ManifestRepository;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::project::{Project, ProjectId, ProjectStatus};

/// Repository-relative path of the manifest
pub const MANIFEST_PATH: &str = "data/obras.json";

/// Note written into freshly bootstrapped manifests
pub const MANIFEST_NOTE: &str = "Arquivo gerado automaticamente pelo Portal de Imagens de Obras. Use no Power BI via Conector Web.";

/// Upload state of one project
///
/// Parsing is lenient: records may have been edited by hand or by other
/// tools. Missing or null text fields become empty, an unrecognized status
/// is kept verbatim and unknown keys are carried through on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    #[serde(rename = "codigo", default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(rename = "nome", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "local", default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, skip_serializing_if = "RecordStatus::is_unset")]
    pub status: RecordStatus,
    #[serde(rename = "capa", default)]
    pub cover_url: Option<String>,
    #[serde(rename = "imagens", default, deserialize_with = "null_as_default")]
    pub progress_urls: Vec<String>,
    #[serde(rename = "totalImagens", default, deserialize_with = "null_as_default")]
    pub total_image_count: usize,
    #[serde(rename = "ultimaAtualizacao", default, deserialize_with = "lenient_date")]
    pub last_updated: Option<NaiveDate>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Status as written in a record
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RecordStatus {
    Known(ProjectStatus),
    /// Value this portal does not recognize, written back unchanged
    Unrecognized(serde_json::Value),
    #[default]
    Unset,
}

impl RecordStatus {
    pub fn known(&self) -> Option<ProjectStatus> {
        match self {
            RecordStatus::Known(status) => Some(*status),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, RecordStatus::Unset)
    }
}

impl From<ProjectStatus> for RecordStatus {
    fn from(status: ProjectStatus) -> Self {
        RecordStatus::Known(status)
    }
}

impl PartialEq<ProjectStatus> for RecordStatus {
    fn eq(&self, other: &ProjectStatus) -> bool {
        self.known() == Some(*other)
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Known(status) => write!(f, "{status}"),
            RecordStatus::Unrecognized(serde_json::Value::String(raw)) => f.write_str(raw),
            RecordStatus::Unrecognized(raw) => write!(f, "{raw}"),
            RecordStatus::Unset => f.write_str("-"),
        }
    }
}

impl Serialize for RecordStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordStatus::Known(status) => status.serialize(serializer),
            RecordStatus::Unrecognized(raw) => raw.serialize(serializer),
            RecordStatus::Unset => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for RecordStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(RecordStatus::Unset);
        }
        Ok(match serde_json::from_value::<ProjectStatus>(raw.clone()) {
            Ok(status) => RecordStatus::Known(status),
            Err(_) => {
                tracing::debug!("Keeping unrecognized project status {}", raw);
                RecordStatus::Unrecognized(raw)
            }
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    let Some(text) = raw.as_str() else {
        return Ok(None);
    };
    let date = parse_record_date(text);
    if date.is_none() {
        tracing::warn!("Ignoring unreadable update date {:?}", text);
    }
    Ok(date)
}

/// `YYYY-MM-DD`, a full RFC 3339 timestamp or `dd/mm/yyyy`
pub fn parse_record_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .or_else(|| NaiveDate::parse_from_str(text, "%d/%m/%Y").ok())
}

impl ProjectRecord {
    /// Empty record seeded from static project data
    pub fn from_project(project: &Project) -> Self {
        Self {
            id: project.id,
            code: project.code.clone(),
            name: project.name.clone(),
            location: project.location.clone(),
            status: project.status.into(),
            cover_url: None,
            progress_urls: Vec::new(),
            total_image_count: 0,
            last_updated: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Cover counts as one image, plus every progress photo
    pub fn computed_total(&self) -> usize {
        usize::from(self.cover_url.is_some()) + self.progress_urls.len()
    }

    pub fn recompute_total(&mut self) {
        self.total_image_count = self.computed_total();
    }

    /// Append a progress URL unless it is already listed; true if appended
    pub fn append_progress_url(&mut self, url: &str) -> bool {
        if self.progress_urls.iter().any(|u| u == url) {
            return false;
        }
        self.progress_urls.push(url.to_string());
        true
    }
}

/// The shared manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(rename = "obras", default)]
    pub records: Vec<ProjectRecord>,
    #[serde(rename = "geradoEm", default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(rename = "instrucao", default)]
    pub note: Option<String>,
    /// Keys written by other tools, carried through unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Result of folding one upload into the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMerge {
    pub cover_url: Option<String>,
    pub progress_urls: Vec<String>,
}

impl ManifestDocument {
    /// Fresh document with one empty record per known project
    pub fn bootstrap<'a>(projects: impl IntoIterator<Item = &'a Project>, now: DateTime<Utc>) -> Self {
        Self {
            records: projects.into_iter().map(ProjectRecord::from_project).collect(),
            generated_at: Some(now),
            note: Some(MANIFEST_NOTE.to_string()),
            extra: serde_json::Map::new(),
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Pretty JSON with two-space indentation
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn record(&self, id: ProjectId) -> Option<&ProjectRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Find the project's record, creating it from static data when missing
    pub fn record_mut_or_insert(&mut self, project: &Project) -> &mut ProjectRecord {
        let index = match self.records.iter().position(|r| r.id == project.id) {
            Some(index) => index,
            None => {
                self.records.push(ProjectRecord::from_project(project));
                self.records.len() - 1
            }
        };
        &mut self.records[index]
    }

    /// Recompute every derived total
    pub fn normalize(&mut self) {
        for record in &mut self.records {
            record.recompute_total();
        }
    }

    /// Fold freshly uploaded URLs into the project's record
    ///
    /// The cover is replaced only when a new one was uploaded; progress URLs
    /// are appended in upload order, skipping ones already listed. The
    /// record is marked in progress and stamped with `now`'s date.
    pub fn apply_upload(
        &mut self,
        project: &Project,
        merge: &UploadMerge,
        now: DateTime<Utc>,
    ) -> &ProjectRecord {
        self.generated_at = Some(now);

        let record = self.record_mut_or_insert(project);
        if let Some(cover) = &merge.cover_url {
            record.cover_url = Some(cover.clone());
        }
        for url in &merge.progress_urls {
            record.append_progress_url(url);
        }
        record.status = ProjectStatus::InProgress.into();
        record.recompute_total();
        record.last_updated = Some(now.date_naive());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectCatalog;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 13, 45, 0).unwrap()
    }

    #[test]
    fn bootstrap_has_one_empty_record_per_project() {
        let catalog = ProjectCatalog::builtin();
        let doc = ManifestDocument::bootstrap(catalog.iter(), now());

        assert_eq!(doc.records.len(), catalog.len());
        for record in &doc.records {
            assert!(record.cover_url.is_none());
            assert!(record.progress_urls.is_empty());
            assert_eq!(record.total_image_count, 0);
            assert!(record.last_updated.is_none());
        }
        assert_eq!(doc.note.as_deref(), Some(MANIFEST_NOTE));
    }

    #[test]
    fn parses_published_layout() {
        let json = r#"{
            "obras": [{
                "id": 3,
                "codigo": "OBR-003",
                "nome": "Obra 03",
                "local": "Local da Obra 03",
                "status": "em_andamento",
                "capa": "https://raw/x/capa.jpg",
                "imagens": ["https://raw/x/img-01.jpg"],
                "totalImagens": 99,
                "ultimaAtualizacao": "2024-03-02",
                "observacao": "fiscal: Joana"
            }],
            "geradoEm": "2024-03-02T10:00:00.000Z",
            "instrucao": "nota",
            "powerBi": {"refresh": true}
        }"#;

        let doc = ManifestDocument::from_json(json.as_bytes()).unwrap();
        let record = doc.record(ProjectId(3)).unwrap();
        assert_eq!(record.status, ProjectStatus::InProgress);
        assert_eq!(record.total_image_count, 99);
        assert_eq!(record.computed_total(), 2);
        assert_eq!(
            record.last_updated,
            Some(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())
        );
        assert!(doc.extra.contains_key("powerBi"));

        let out: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(out["powerBi"]["refresh"], true);
        assert_eq!(out["obras"][0]["ultimaAtualizacao"], "2024-03-02");
        assert_eq!(out["obras"][0]["observacao"], "fiscal: Joana");
    }

    #[test]
    fn lenient_record_fields() {
        let json = r#"{"obras":[
            {"id":1},
            {"id":2,"codigo":null,"status":"pausada","imagens":null,
             "ultimaAtualizacao":"2024-03-02T23:30:00-03:00"},
            {"id":3,"status":"concluida","ultimaAtualizacao":"15/01/2024"},
            {"id":4,"ultimaAtualizacao":"ontem"}
        ]}"#;
        let doc = ManifestDocument::from_json(json.as_bytes()).unwrap();

        let bare = doc.record(ProjectId(1)).unwrap();
        assert!(bare.status.is_unset());
        assert_eq!(bare.code, "");
        assert!(bare.progress_urls.is_empty());

        let paused = doc.record(ProjectId(2)).unwrap();
        assert_eq!(paused.status.known(), None);
        assert_eq!(paused.status.to_string(), "pausada");
        assert_eq!(paused.last_updated, NaiveDate::from_ymd_opt(2024, 3, 3));

        let done = doc.record(ProjectId(3)).unwrap();
        assert_eq!(done.status, ProjectStatus::Completed);
        assert_eq!(done.last_updated, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert!(doc.record(ProjectId(4)).unwrap().last_updated.is_none());

        let out: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert!(out["obras"][0].get("status").is_none());
        assert_eq!(out["obras"][1]["status"], "pausada");
        assert_eq!(out["obras"][2]["status"], "concluida");
    }

    #[test]
    fn null_fields_parse_as_empty() {
        let json = r#"{"obras":[{"id":1,"codigo":"A","nome":"A","local":"A",
            "status":"nao_iniciada","capa":null,"imagens":[],"totalImagens":0,
            "ultimaAtualizacao":null}],"geradoEm":null}"#;
        let doc = ManifestDocument::from_json(json.as_bytes()).unwrap();
        assert!(doc.records[0].cover_url.is_none());
        assert!(doc.generated_at.is_none());
    }

    #[test]
    fn apply_upload_sets_cover_status_and_date() {
        let catalog = ProjectCatalog::builtin();
        let project = catalog.get(ProjectId(5)).unwrap();
        let mut doc = ManifestDocument::bootstrap(catalog.iter(), now());

        let record = doc.apply_upload(
            project,
            &UploadMerge {
                cover_url: Some("u/capa.jpg".into()),
                progress_urls: vec!["u/img-01.jpg".into()],
            },
            now(),
        );

        assert_eq!(record.total_image_count, 2);
        assert_eq!(record.status, ProjectStatus::InProgress);
        assert_eq!(record.last_updated, Some(now().date_naive()));
    }

    #[test]
    fn apply_upload_keeps_prior_cover_and_dedupes() {
        let catalog = ProjectCatalog::builtin();
        let project = catalog.get(ProjectId(1)).unwrap();
        let mut doc = ManifestDocument::bootstrap(catalog.iter(), now());
        doc.apply_upload(
            project,
            &UploadMerge {
                cover_url: Some("u/capa.png".into()),
                progress_urls: vec!["u/img-01.jpg".into(), "u/img-02.jpg".into()],
            },
            now(),
        );

        let record = doc.apply_upload(
            project,
            &UploadMerge {
                cover_url: None,
                progress_urls: vec!["u/img-02.jpg".into(), "u/img-03.jpg".into()],
            },
            now(),
        );

        assert_eq!(record.cover_url.as_deref(), Some("u/capa.png"));
        assert_eq!(
            record.progress_urls,
            vec!["u/img-01.jpg", "u/img-02.jpg", "u/img-03.jpg"]
        );
        assert_eq!(record.total_image_count, 4);
    }

    #[test]
    fn missing_record_is_created_from_catalog() {
        let project = Project {
            id: ProjectId(42),
            code: "OBR-042".into(),
            name: "Viaduto".into(),
            location: "Zona Norte".into(),
            status: ProjectStatus::NotStarted,
        };
        let mut doc = ManifestDocument::bootstrap(std::iter::empty::<&Project>(), now());
        doc.apply_upload(
            &project,
            &UploadMerge {
                cover_url: None,
                progress_urls: vec!["u/img-01.jpg".into()],
            },
            now(),
        );

        let record = doc.record(ProjectId(42)).unwrap();
        assert_eq!(record.code, "OBR-042");
        assert_eq!(record.location, "Zona Norte");
        assert_eq!(record.total_image_count, 1);
    }

    #[test]
    fn normalize_overrides_stale_totals() {
        let catalog = ProjectCatalog::builtin();
        let mut doc = ManifestDocument::bootstrap(catalog.iter(), now());
        doc.records[0].total_image_count = 17;
        doc.records[1].progress_urls.push("u/img-01.jpg".into());
        doc.normalize();
        assert_eq!(doc.records[0].total_image_count, 0);
        assert_eq!(doc.records[1].total_image_count, 1);
    }
}
