use crate::output::print_json;
use depboard_core::aggregate::IssueBoard;
use depboard_core::sort::SortVariant;
use std::collections::BTreeMap;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let aggregator = super::aggregator(&config);

    let rt = tokio::runtime::Runtime::new()?;
    let arena = rt.block_on(aggregator.fetch_issues())?;
    let board = IssueBoard::build(arena, SortVariant::Standard);

    if json {
        return print_json(&serde_json::json!({
            "chains": board.chains,
            "graph": board.graph,
        }));
    }

    if board.graph.is_empty() {
        println!("No blocking relations between top-level issues.");
        return Ok(());
    }

    println!("Chains:");
    for line in board.chains.render() {
        println!("  {line}");
    }

    let mut layers: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for node in &board.graph.nodes {
        layers
            .entry(node.layer)
            .or_default()
            .push(format!("#{}", node.number));
    }
    println!("\nLayers:");
    for (layer, nodes) in layers {
        println!("  {layer}: {}", nodes.join(" "));
    }
    Ok(())
}
