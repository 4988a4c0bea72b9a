use crate::output::{print_json, print_table};
use depboard_core::aggregate::IssueBoard;
use depboard_core::sort::SortVariant;
use std::path::Path;

const TITLE_WIDTH: usize = 60;

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn run(root: &Path, size: bool, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let variant = if size {
        SortVariant::SizeTieBreak
    } else {
        SortVariant::Standard
    };
    let aggregator = super::aggregator(&config);

    let rt = tokio::runtime::Runtime::new()?;
    let arena = rt.block_on(aggregator.fetch_issues())?;
    let board = IssueBoard::build(arena, variant);

    if json {
        return print_json(&board);
    }

    if board.rows.is_empty() {
        println!("No open top-level issues.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = board
        .rows
        .iter()
        .filter_map(|row| {
            let issue = board.arena.get(row.number)?;
            let badges: Vec<String> = row.badges.iter().map(|b| b.label()).collect();
            Some(vec![
                format!("{}#{}", row.lead(), row.number),
                truncate(&issue.title, TITLE_WIDTH),
                issue.status.to_string(),
                issue.size.to_string(),
                issue.priority.to_string(),
                issue.block_status.to_string(),
                badges.join(" "),
            ])
        })
        .collect();

    print_table(
        &["ISSUE", "TITLE", "STATUS", "SIZE", "PRIORITY", "BLOCK", "DEPS"],
        rows,
    );
    println!("\n{} top-level issues", board.root_count());
    Ok(())
}
