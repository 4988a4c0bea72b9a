use crate::error::{DashError, Result};
use std::path::{Path, PathBuf};

pub const DEPBOARD_DIR: &str = ".depboard";
pub const CONFIG_FILE: &str = ".depboard/config.yaml";
pub const DAEMON_LOG_FILE: &str = ".depboard/server.log";

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn depboard_dir(root: &Path) -> PathBuf {
    root.join(DEPBOARD_DIR)
}

pub fn daemon_log_path(root: &Path) -> PathBuf {
    root.join(DAEMON_LOG_FILE)
}

/// `~/.depboard`, where running dashboard daemons are recorded.
pub fn user_depboard_dir() -> Result<PathBuf> {
    home::home_dir()
        .map(|h| h.join(DEPBOARD_DIR))
        .ok_or(DashError::HomeNotFound)
}
