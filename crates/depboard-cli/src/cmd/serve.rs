use anyhow::anyhow;
use depboard_core::daemon::{self, DaemonRecord};
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>, no_open: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let name = config.dashboard_name();
    let port = port.unwrap_or(config.server.port);

    // Prune stale records; error if a live instance already exists.
    if let Some(record) = daemon::find_by_name(&name)? {
        if record.pid != std::process::id() && daemon::is_pid_alive(record.pid) {
            return Err(anyhow!(
                "dashboard '{}' is already running at {} (PID {})\n\
                 Run `depboard stop` to stop it first.",
                name,
                record.url,
                record.pid
            ));
        }
        let _ = record.remove();
    }

    let rt = tokio::runtime::Runtime::new()?;
    let root_buf = root.to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        let pid = std::process::id();
        let url = format!("http://localhost:{actual_port}");

        let record = DaemonRecord {
            name: name.clone(),
            root: root_buf,
            pid,
            port: actual_port,
            url: url.clone(),
            started_at: chrono::Utc::now(),
        };
        record.write()?;

        println!("depboard for '{name}' → {url}  (PID {pid})");

        let result = tokio::select! {
            res = depboard_server::serve_on(config, listener, !no_open) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        };

        let _ = record.remove();
        result
    })
}
