pub mod daemon;
pub mod graph;
pub mod init;
pub mod issues;
pub mod serve;
pub mod set;

use anyhow::bail;
use depboard_core::aggregate::Aggregator;
use depboard_core::config::{Config, WarnLevel};
use depboard_core::tracker::TrackerClient;
use std::path::Path;

/// Load the config, logging warnings and refusing to continue on errors.
pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    let config = Config::load(root)?;
    let mut errors = Vec::new();
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => errors.push(w.message),
        }
    }
    if !errors.is_empty() {
        bail!("invalid config: {}", errors.join("; "));
    }
    Ok(config)
}

pub fn aggregator(config: &Config) -> Aggregator {
    Aggregator::new(TrackerClient::from_config(&config.tracker), config.clone())
}
