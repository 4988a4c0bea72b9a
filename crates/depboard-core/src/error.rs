use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("not initialized: run 'depboard init' (no config at {0})")]
    NotInitialized(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("tracker API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("tracker GraphQL error: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("tracker returned an empty response")]
    EmptyResponse,

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown value: {0}")]
    UnknownValue(String),

    #[error("issue #{0} is not an item of the configured project")]
    IssueNotInProject(u64),

    #[error("daemon not running: {0}")]
    DaemonNotRunning(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DashError {
    /// True for errors the caller caused by sending a bad field or value.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DashError::UnknownField(_) | DashError::UnknownValue(_) | DashError::IssueNotInProject(_)
        )
    }

    /// True for failures that originate at the tracker.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            DashError::Api { .. } | DashError::GraphQl(_) | DashError::EmptyResponse | DashError::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DashError>;
