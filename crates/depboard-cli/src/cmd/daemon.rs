use crate::output::{print_json, print_table};
use anyhow::{anyhow, Context};
use depboard_core::daemon;
use depboard_core::paths;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// start
// ---------------------------------------------------------------------------

pub fn start(root: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let name = config.dashboard_name();

    if let Some(record) = daemon::find_by_name(&name)? {
        if daemon::is_pid_alive(record.pid) {
            return Err(anyhow!(
                "dashboard '{}' is already running at {} (PID {})",
                name,
                record.url,
                record.pid
            ));
        }
        let _ = record.remove();
    }

    let log_path = paths::daemon_log_path(root);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log = std::fs::File::create(&log_path)
        .with_context(|| format!("failed to create {}", log_path.display()))?;
    let err_log = log.try_clone()?;

    let exe = std::env::current_exe().context("cannot locate the depboard binary")?;
    let port = port.unwrap_or(config.server.port);
    let child = Command::new(exe)
        .arg("--root")
        .arg(root)
        .args(["serve", "--no-open", "--port", &port.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(err_log))
        .spawn()
        .context("failed to spawn the dashboard server")?;
    let pid = child.id();

    let deadline = Instant::now() + STARTUP_TIMEOUT;
    while Instant::now() < deadline {
        if let Some(record) = daemon::find_by_name(&name)? {
            if record.pid == pid {
                println!("depboard for '{name}' → {}  (PID {pid})", record.url);
                println!("log: {}", log_path.display());
                return Ok(());
            }
        }
        if !daemon::is_pid_alive(pid) {
            break;
        }
        std::thread::sleep(Duration::from_millis(200));
    }

    Err(anyhow!(
        "dashboard did not come up; see {}",
        log_path.display()
    ))
}

// ---------------------------------------------------------------------------
// stop
// ---------------------------------------------------------------------------

pub fn stop(root: &Path) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let name = config.dashboard_name();

    let record = daemon::find_by_name(&name)?
        .ok_or_else(|| anyhow!("no running dashboard recorded for '{name}'"))?;

    if !daemon::is_pid_alive(record.pid) {
        let _ = record.remove();
        return Err(anyhow!(
            "dashboard '{name}' is not running (stale record removed)"
        ));
    }

    daemon::kill_pid(record.pid)?;
    let _ = record.remove();

    println!("Stopped dashboard '{name}' (PID {})", record.pid);
    Ok(())
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

pub fn status(json: bool) -> anyhow::Result<()> {
    let mut records = daemon::read_all()?;

    // Prune stale records silently.
    records.retain(|r| {
        if daemon::is_pid_alive(r.pid) {
            true
        } else {
            let _ = r.remove();
            false
        }
    });

    if json {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No running dashboards.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                r.port.to_string(),
                r.pid.to_string(),
                r.url.clone(),
                r.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ]
        })
        .collect();

    print_table(&["NAME", "PORT", "PID", "URL", "STARTED"], rows);
    Ok(())
}
