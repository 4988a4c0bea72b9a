use anyhow::{bail, Context};
use depboard_core::config::Config;
use depboard_core::paths;
use std::path::Path;

pub fn run(
    root: &Path,
    owner: Option<String>,
    project: Option<u64>,
    repo: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    let config_path = paths::config_path(root);
    if config_path.exists() && !force {
        println!("  exists:  {}", paths::CONFIG_FILE);
        return Ok(());
    }

    let owner = owner.unwrap_or_else(|| "your-org".to_string());
    let dir_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repo".to_string());
    let (repo_owner, repo_name) = match repo {
        Some(slug) => match slug.split_once('/') {
            Some((o, n)) if !o.is_empty() && !n.is_empty() => (o.to_string(), n.to_string()),
            _ => bail!("--repo must look like owner/name, got '{slug}'"),
        },
        None => (owner.clone(), dir_name),
    };

    let config = Config::new(owner, project.unwrap_or(1), repo_owner, repo_name);
    config
        .save(root)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!("  created: {}", paths::CONFIG_FILE);
    println!(
        "\nFill in project.id and the field ids/options under `fields`, then export {} \
         and run `depboard issues`.",
        config.tracker.token_env
    );
    Ok(())
}
