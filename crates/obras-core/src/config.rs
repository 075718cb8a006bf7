//! Configuration for obras-core
//!
//! Loaded from a TOML file, by default `<config_dir>/obras-portal/config.toml`:
//!
//! ```toml
//! [store]
//! owner = "acme-engenharia"
//! repo = "obras-imagens"
//! token = "ghp_..."
//! branch = "main"
//!
//! [upload]
//! conflict = "fail"            # or "reload_and_retry"
//! max_conflict_retries = 3
//!
//! [[projects]]
//! id = 1
//! code = "OBR-001"
//! name = "Obra 01"
//! location = "Local da Obra 01"
//! status = "em_andamento"
//! ```
//!
//! A missing file yields the default (unconfigured) configuration. The
//! credential may be overridden with `OBRAS_GITHUB_TOKEN`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::project::{Project, ProjectCatalog};

/// Environment variable that overrides `store.token`
pub const TOKEN_ENV_VAR: &str = "OBRAS_GITHUB_TOKEN";

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Portal configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    /// Replaces the built-in catalog when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
}

/// Content store target and credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    /// Per-request timeout; no timeout when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}
fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
fn default_raw_base() -> String {
    DEFAULT_RAW_BASE.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            token: String::new(),
            branch: default_branch(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            timeout_secs: None,
        }
    }
}

impl StoreConfig {
    /// Build a target with trimmed fields; an empty branch falls back to `main`
    pub fn new(owner: &str, repo: &str, token: &str, branch: &str) -> Self {
        let branch = branch.trim();
        Self {
            owner: owner.trim().to_string(),
            repo: repo.trim().to_string(),
            token: token.trim().to_string(),
            branch: if branch.is_empty() {
                default_branch()
            } else {
                branch.to_string()
            },
            ..Self::default()
        }
    }

    /// Owner, repository and credential are all present
    pub fn is_configured(&self) -> bool {
        !self.owner.is_empty() && !self.repo.is_empty() && !self.token.is_empty()
    }

    /// Base URL for raw file retrieval on the configured branch
    pub fn raw_base_url(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.raw_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.branch
        )
    }

    /// First missing field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.owner.is_empty() {
            Some("store.owner")
        } else if self.repo.is_empty() {
            Some("store.repo")
        } else if self.token.is_empty() {
            Some("store.token")
        } else {
            None
        }
    }
}

/// What to do when the manifest write is rejected as stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Abort the operation
    #[default]
    Fail,
    /// Reload the manifest, re-apply the merge and write again
    ReloadAndRetry,
}

/// Upload behavior configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub conflict: ConflictPolicy,
    /// Extra manifest write attempts under `reload_and_retry`
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

fn default_max_conflict_retries() -> u32 {
    3
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            conflict: ConflictPolicy::Fail,
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

impl PortalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("obras-portal").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from a file; a missing file yields the default configuration
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            tracing::debug!("No config file at {:?}, using defaults", path);
            Self::default()
        };

        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                config.store.token = token.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Write to a file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Project catalog: the configured list, else the built-in table
    pub fn catalog(&self) -> ProjectCatalog {
        match &self.projects {
            Some(projects) => ProjectCatalog::new(projects.clone()),
            None => ProjectCatalog::builtin(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.branch.trim().is_empty() {
            return Err(ConfigError::MissingField("store.branch".to_string()));
        }

        for base in [&self.store.api_base, &self.store.raw_base] {
            url::Url::parse(base)
                .map_err(|e| ConfigError::Invalid(format!("{base}: {e}")))?;
        }

        if let Some(projects) = &self.projects {
            let mut seen = std::collections::HashSet::new();
            for project in projects {
                if !seen.insert(project.id) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate project id {}",
                        project.id
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{ProjectId, ProjectStatus};

    #[test]
    fn default_config_is_unconfigured() {
        let config = PortalConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.store.is_configured());
        assert_eq!(config.store.missing_field(), Some("store.owner"));
        assert_eq!(config.store.branch, "main");
        assert_eq!(config.upload.conflict, ConflictPolicy::Fail);
    }

    #[test]
    fn store_config_trims_and_defaults_branch() {
        let store = StoreConfig::new(" acme ", "fotos ", " tok", "  ");
        assert_eq!(store.owner, "acme");
        assert_eq!(store.repo, "fotos");
        assert_eq!(store.token, "tok");
        assert_eq!(store.branch, "main");
        assert!(store.is_configured());
        assert_eq!(
            store.raw_base_url(),
            "https://raw.githubusercontent.com/acme/fotos/main"
        );
    }

    #[test]
    fn parses_partial_toml() {
        let config = PortalConfig::from_toml(
            r#"
            [store]
            owner = "acme"
            repo = "fotos"
            token = "tok"

            [upload]
            conflict = "reload_and_retry"

            [[projects]]
            id = 4
            code = "OBR-004"
            name = "Ponte"
            location = "Centro"
            status = "concluida"
            "#,
        )
        .unwrap();

        assert!(config.store.is_configured());
        assert_eq!(config.store.api_base, DEFAULT_API_BASE);
        assert_eq!(config.upload.conflict, ConflictPolicy::ReloadAndRetry);
        assert_eq!(config.upload.max_conflict_retries, 3);

        let catalog = config.catalog();
        assert_eq!(catalog.len(), 1);
        let project = catalog.get(ProjectId(4)).unwrap();
        assert_eq!(project.status, ProjectStatus::Completed);
    }

    #[test]
    fn rejects_duplicate_project_ids() {
        let result = PortalConfig::from_toml(
            r#"
            [[projects]]
            id = 1
            code = "A"
            name = "A"
            location = "A"

            [[projects]]
            id = 1
            code = "B"
            name = "B"
            location = "B"
            "#,
        )
        .unwrap()
        .validate();
        assert!(result.is_err());
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = PortalConfig::default();
        config.store = StoreConfig::new("acme", "fotos", "tok", "dev");
        config.save(&path).unwrap();

        let loaded = PortalConfig::load(&path).unwrap();
        assert_eq!(loaded.store.owner, "acme");
        assert_eq!(loaded.store.branch, "dev");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PortalConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.store.branch, "main");
    }
}
