mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "depboard",
    about = "Live issue-dependency dashboard for a tracker project",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .depboard/)
    #[arg(long, global = true, env = "DEPBOARD_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config template to .depboard/config.yaml
    Init {
        /// Login of the organization or user that owns the project
        #[arg(long)]
        owner: Option<String>,
        /// Project number
        #[arg(long)]
        project: Option<u64>,
        /// Repository as owner/name (default: <owner>/<directory name>)
        #[arg(long)]
        repo: Option<String>,
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Print the issue table
    Issues {
        /// Break ties on size (smallest first) after priority
        #[arg(long)]
        size: bool,
    },

    /// Print dependency chains and graph layers between top-level issues
    Graph,

    /// Set a status, size or priority on an issue
    Set {
        /// Issue number
        issue: u64,
        /// status | size | priority
        field: String,
        /// Option name, as configured
        value: String,
    },

    /// Serve the live dashboard in the foreground
    Serve {
        /// Port to listen on (default: server.port from config, 0 = OS-assigned)
        #[arg(long)]
        port: Option<u16>,
        /// Don't open browser automatically
        #[arg(long)]
        no_open: bool,
    },

    /// Start the dashboard in the background
    Start {
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Stop the background dashboard for this project
    Stop,

    /// List running dashboards
    Status,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } | Commands::Start { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init {
            owner,
            project,
            repo,
            force,
        } => cmd::init::run(&root, owner, project, repo.as_deref(), force),
        Commands::Issues { size } => cmd::issues::run(&root, size, cli.json),
        Commands::Graph => cmd::graph::run(&root, cli.json),
        Commands::Set {
            issue,
            field,
            value,
        } => cmd::set::run(&root, issue, &field, &value, cli.json),
        Commands::Serve { port, no_open } => cmd::serve::run(&root, port, no_open),
        Commands::Start { port } => cmd::daemon::start(&root, port),
        Commands::Stop => cmd::daemon::stop(&root),
        Commands::Status => cmd::daemon::status(cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
