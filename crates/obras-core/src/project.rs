//! Static project catalog
//!
//! Projects are immutable reference data: the construction sites the portal
//! tracks. The catalog is loaded once at startup, either from the built-in
//! table or from the `[[projects]]` list of the config file.

use serde::{Deserialize, Serialize};

/// Stable numeric project identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub u32);

impl ProjectId {
    /// Directory name under `images/`, id zero-padded to two digits
    pub fn image_dir(&self) -> String {
        format!("images/obra-{:02}", self.0)
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(ProjectId)
    }
}

/// Project status, serialized with the manifest's wire values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "nao_iniciada")]
    NotStarted,
    #[serde(rename = "em_andamento")]
    InProgress,
    #[serde(rename = "concluida")]
    Completed,
}

impl ProjectStatus {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::NotStarted => "Não Iniciada",
            ProjectStatus::InProgress => "Em Andamento",
            ProjectStatus::Completed => "Concluída",
        }
    }

    /// Wire value used in `data/obras.json`
    pub fn as_wire(&self) -> &'static str {
        match self {
            ProjectStatus::NotStarted => "nao_iniciada",
            ProjectStatus::InProgress => "em_andamento",
            ProjectStatus::Completed => "concluida",
        }
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::NotStarted
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A construction site tracked by the portal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub code: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub status: ProjectStatus,
}

/// Ordered, read-only list of known projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCatalog {
    projects: Vec<Project>,
}

impl ProjectCatalog {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    /// Built-in table of fifteen sites; the first two are already running
    pub fn builtin() -> Self {
        let projects = (1..=15u32)
            .map(|n| Project {
                id: ProjectId(n),
                code: format!("OBR-{n:03}"),
                name: format!("Obra {n:02}"),
                location: format!("Local da Obra {n:02}"),
                status: if n <= 2 {
                    ProjectStatus::InProgress
                } else {
                    ProjectStatus::NotStarted
                },
            })
            .collect();
        Self { projects }
    }

    pub fn get(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }
}

impl Default for ProjectCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
