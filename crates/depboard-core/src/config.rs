use crate::error::{DashError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// TrackerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    /// Name of the environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_graphql_url() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_rest_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            graphql_url: default_graphql_url(),
            rest_url: default_rest_url(),
            token_env: default_token_env(),
        }
    }
}

impl TrackerConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig / RepositoryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    #[default]
    Organization,
    User,
}

impl OwnerKind {
    /// Root GraphQL field that owns the project.
    pub fn graphql_field(self) -> &'static str {
        match self {
            OwnerKind::Organization => "organization",
            OwnerKind::User => "user",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub owner: String,
    #[serde(default)]
    pub owner_kind: OwnerKind,
    pub number: u64,
    /// Project node id, required for field writes.
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
}

impl RepositoryConfig {
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// FieldConfig
// ---------------------------------------------------------------------------

/// A single-select project field: its display name, node id and the option
/// ids keyed by option name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl FieldConfig {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Option id for `value`, matching option names case-insensitively.
    pub fn option_id(&self, value: &str) -> Option<&str> {
        let wanted = value.trim();
        self.options
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, id)| id.as_str())
    }

    pub fn option_names(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(|k| k.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldsConfig {
    #[serde(default = "default_status_field")]
    pub status: FieldConfig,
    #[serde(default = "default_size_field")]
    pub size: FieldConfig,
    #[serde(default = "default_priority_field")]
    pub priority: FieldConfig,
}

fn default_status_field() -> FieldConfig {
    FieldConfig::named("Status")
}

fn default_size_field() -> FieldConfig {
    FieldConfig::named("Size")
}

fn default_priority_field() -> FieldConfig {
    FieldConfig::named("Priority")
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            status: default_status_field(),
            size: default_size_field(),
            priority: default_priority_field(),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncConfig / ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Deployments and workflow runs older than this are dropped.
    #[serde(default = "default_recency_window")]
    pub recency_window_mins: i64,
}

fn default_poll_interval() -> u64 {
    30
}

fn default_recency_window() -> i64 {
    10
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            recency_window_mins: default_recency_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub tracker: TrackerConfig,
    pub project: ProjectConfig,
    pub repository: RepositoryConfig,
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub fields: FieldsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

fn default_branches() -> Vec<String> {
    vec!["main".to_string()]
}

fn default_page_size() -> u32 {
    100
}

impl Config {
    pub fn new(
        owner: impl Into<String>,
        project_number: u64,
        repo_owner: impl Into<String>,
        repo_name: impl Into<String>,
    ) -> Self {
        Self {
            version: 1,
            tracker: TrackerConfig::default(),
            project: ProjectConfig {
                owner: owner.into(),
                owner_kind: OwnerKind::default(),
                number: project_number,
                id: String::new(),
            },
            repository: RepositoryConfig {
                owner: repo_owner.into(),
                name: repo_name.into(),
            },
            branches: default_branches(),
            page_size: default_page_size(),
            fields: FieldsConfig::default(),
            sync: SyncConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Name used for the daemon record of this dashboard.
    pub fn dashboard_name(&self) -> String {
        format!("{}-{}", self.repository.owner, self.repository.name)
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(DashError::NotInitialized(path));
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.page_size == 0 || self.page_size > 100 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("page_size must be between 1 and 100, got {}", self.page_size),
            });
        }

        if self.project.id.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "project.id is empty: field updates will fail".to_string(),
            });
        }

        for (key, field) in [
            ("status", &self.fields.status),
            ("size", &self.fields.size),
            ("priority", &self.fields.priority),
        ] {
            if field.id.trim().is_empty() || field.options.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "fields.{key} has no id or options: '{}' cannot be edited",
                        field.name
                    ),
                });
            }
        }

        if self.sync.poll_interval_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "sync.poll_interval_secs must be positive".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
