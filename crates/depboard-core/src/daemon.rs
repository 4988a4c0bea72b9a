use crate::error::{DashError, Result};
use crate::io::atomic_write;
use crate::paths::user_depboard_dir;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// DaemonRecord
// ---------------------------------------------------------------------------

/// A running dashboard server, recorded so `depboard stop` can find it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonRecord {
    pub name: String,
    pub root: PathBuf,
    pub pid: u32,
    pub port: u16,
    pub url: String,
    pub started_at: DateTime<Utc>,
}

impl DaemonRecord {
    fn path_in(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.yaml"))
    }

    /// Atomically write this record to `~/.depboard/{name}.yaml`.
    pub fn write(&self) -> Result<()> {
        self.write_in(&user_depboard_dir()?)
    }

    pub fn write_in(&self, dir: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        atomic_write(&Self::path_in(dir, &self.name), data.as_bytes())
    }

    /// Remove this record file. Silently succeeds if the file is gone.
    pub fn remove(&self) -> Result<()> {
        self.remove_in(&user_depboard_dir()?)
    }

    pub fn remove_in(&self, dir: &Path) -> Result<()> {
        let path = Self::path_in(dir, &self.name);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry helpers
// ---------------------------------------------------------------------------

pub fn read_all() -> Result<Vec<DaemonRecord>> {
    read_all_in(&user_depboard_dir()?)
}

/// Read every record in `dir`. Files that do not parse as records are skipped.
pub fn read_all_in(dir: &Path) -> Result<Vec<DaemonRecord>> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut records = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let Ok(data) = std::fs::read_to_string(&path) else {
            continue;
        };
        if let Ok(record) = serde_yaml::from_str::<DaemonRecord>(&data) {
            records.push(record);
        }
    }
    records.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(records)
}

pub fn find_by_name(name: &str) -> Result<Option<DaemonRecord>> {
    find_by_name_in(&user_depboard_dir()?, name)
}

pub fn find_by_name_in(dir: &Path, name: &str) -> Result<Option<DaemonRecord>> {
    let path = DaemonRecord::path_in(dir, name);
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(&path)?;
    Ok(Some(serde_yaml::from_str(&data)?))
}

// ---------------------------------------------------------------------------
// PID helpers (Unix only)
// ---------------------------------------------------------------------------

/// Returns true if the process is still alive (`kill -0 {pid}`).
pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Send SIGTERM to a process (`kill -TERM {pid}`).
pub fn kill_pid(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let status = std::process::Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()?;
        if !status.success() {
            return Err(DashError::DaemonNotRunning(format!(
                "kill -TERM {pid} failed with exit code {:?}",
                status.code()
            )));
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(DashError::Io(std::io::Error::other(
            "stopping a daemon is not supported on this platform",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, port: u16) -> DaemonRecord {
        DaemonRecord {
            name: name.to_string(),
            root: PathBuf::from("/tmp/project"),
            pid: 4242,
            port,
            url: format!("http://localhost:{port}"),
            started_at: Utc::now(),
        }
    }

    #[test]
    fn write_find_remove() {
        let dir = TempDir::new().unwrap();
        let rec = record("acme-widgets", 3141);
        rec.write_in(dir.path()).unwrap();

        let found = find_by_name_in(dir.path(), "acme-widgets").unwrap().unwrap();
        assert_eq!(found, rec);

        rec.remove_in(dir.path()).unwrap();
        assert!(find_by_name_in(dir.path(), "acme-widgets").unwrap().is_none());
        rec.remove_in(dir.path()).unwrap();
    }

    #[test]
    fn read_all_skips_foreign_files() {
        let dir = TempDir::new().unwrap();
        record("b", 2).write_in(dir.path()).unwrap();
        record("a", 1).write_in(dir.path()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "not: [a record").unwrap();

        let names: Vec<String> = read_all_in(dir.path())
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn read_all_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_all_in(&dir.path().join("nope")).unwrap().is_empty());
    }
}
