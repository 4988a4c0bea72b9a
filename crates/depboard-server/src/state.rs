use std::sync::Arc;
use std::time::Duration;

use depboard_core::aggregate::Aggregator;
use depboard_core::config::Config;
use depboard_core::mutation::MutationGateway;
use depboard_core::tracker::TrackerClient;

use crate::render::Renderer;
use crate::sync::SyncHub;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<SyncHub>,
    pub gateway: MutationGateway,
    pub renderer: Arc<Renderer>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = TrackerClient::from_config(&config.tracker);
        let interval = Duration::from_secs(config.sync.poll_interval_secs.max(1));
        let hub = SyncHub::new(Aggregator::new(client.clone(), config.clone()), interval);
        Ok(Self {
            gateway: MutationGateway::new(client, config.clone()),
            renderer: Arc::new(Renderer::new()?),
            config: Arc::new(config),
            hub: Arc::new(hub),
        })
    }

    /// Spawn the poll loop. Only spawns inside a Tokio runtime.
    pub fn start_sync(&self) {
        if tokio::runtime::Handle::try_current().is_ok() {
            tokio::spawn(Arc::clone(&self.hub).run());
        }
    }
}
