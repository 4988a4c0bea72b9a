use crate::output::print_json;
use depboard_core::mutation::{self, MutationGateway, MutationOutcome};
use depboard_core::tracker::TrackerClient;
use std::path::Path;

pub fn run(root: &Path, issue: u64, field: &str, value: &str, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    // Reject bad input before building a client.
    mutation::validate(&config, field, value)?;

    let gateway = MutationGateway::new(TrackerClient::from_config(&config.tracker), config);
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(gateway.apply(issue, field, value))?;

    if json {
        return print_json(&MutationOutcome::success());
    }
    println!("#{issue}: {field} = {value}");
    Ok(())
}
