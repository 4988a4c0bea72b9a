//! HTML for the live view. The page is split into named regions
//! (`data-region="..."`) that the browser script swaps in place. Each region
//! is a handlebars template under `assets/templates/`, fed a view-model built
//! from the current [`Dashboard`].

use anyhow::Context;
use chrono::{DateTime, Utc};
use depboard_core::aggregate::{Dashboard, IssueBoard};
use depboard_core::config::{Config, FieldConfig};
use depboard_core::graph::{NODE_HEIGHT, NODE_WIDTH};
use depboard_core::issue::Issue;
use depboard_core::signals::{CiCheck, CiRollup};
use depboard_core::types::BlockStatus;
use handlebars::Handlebars;
use rust_embed::Embed;
use serde::Serialize;
use std::collections::HashMap;

use crate::embed::Assets;

pub const REGIONS: &[&str] = &["summary", "issues", "graph", "chains", "prs", "ci", "activity"];

const TEMPLATE_DIR: &str = "templates/";
const TITLE_CHARS: usize = 22;

/// "just now", "42s ago", "5m ago", "3h ago", "2d ago".
pub fn ago(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        0..=4 => "just now".to_string(),
        5..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86400),
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Handlebars registry loaded from the embedded templates. Values are
/// HTML-escaped by the registry's default escape function.
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> anyhow::Result<Self> {
        let mut registry = Handlebars::new();
        for path in <Assets as Embed>::iter() {
            let Some(name) = path
                .strip_prefix(TEMPLATE_DIR)
                .and_then(|p| p.strip_suffix(".hbs"))
            else {
                continue;
            };
            let file = <Assets as Embed>::get(&path)
                .with_context(|| format!("missing template {path}"))?;
            let text = std::str::from_utf8(&file.data)
                .with_context(|| format!("template {path} is not UTF-8"))?;
            registry
                .register_template_string(name, text)
                .with_context(|| format!("invalid template {path}"))?;
        }
        for name in REGIONS.iter().chain(["page", "checks"].iter()) {
            anyhow::ensure!(registry.has_template(name), "template {name}.hbs is not embedded");
        }
        Ok(Self { registry })
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> anyhow::Result<String> {
        self.registry
            .render(name, data)
            .with_context(|| format!("rendering {name}"))
    }

    /// Render a template whose only input is one list under `key`.
    fn listing<T: Serialize>(&self, name: &str, key: &str, items: Vec<T>) -> anyhow::Result<String> {
        self.render(name, &HashMap::from([(key, items)]))
    }

    /// The full document with every region.
    pub fn page(&self, d: &Dashboard, config: &Config, now: DateTime<Utc>) -> anyhow::Result<String> {
        let regions = vec![
            self.summary(d)?,
            self.issues(d, config)?,
            self.graph(d)?,
            self.chains(d)?,
            self.pull_requests(d)?,
            self.ci(d)?,
            self.activity(d, now)?,
        ];
        self.render(
            "page",
            &PageView {
                title: config.repository.slug(),
                fetched: d.fetched_at.to_rfc3339(),
                ago: ago(now, d.fetched_at),
                regions,
            },
        )
    }

    pub fn summary(&self, d: &Dashboard) -> anyhow::Result<String> {
        self.render("summary", &SummaryView::from(d))
    }

    pub fn issues(&self, d: &Dashboard, config: &Config) -> anyhow::Result<String> {
        let view = IssuesView {
            available: d.issues.is_some(),
            rows: d
                .issues
                .as_ref()
                .map(|board| issue_rows(board, config))
                .unwrap_or_default(),
        };
        self.render("issues", &view)
    }

    pub fn graph(&self, d: &Dashboard) -> anyhow::Result<String> {
        self.render("graph", &GraphView::from(d))
    }

    pub fn chains(&self, d: &Dashboard) -> anyhow::Result<String> {
        let lines = d.issues.as_ref().map(|b| b.chains.render()).unwrap_or_default();
        self.listing("chains", "lines", lines)
    }

    pub fn pull_requests(&self, d: &Dashboard) -> anyhow::Result<String> {
        let rows: Vec<PullView> = d
            .pull_requests
            .iter()
            .map(|pr| PullView {
                number: pr.number,
                draft: pr.draft,
                rollup: pr.rollup.as_str(),
                url: &pr.url,
                title: &pr.title,
                branch: &pr.branch,
                merge: pr.merge_state.to_lowercase(),
                review: pr
                    .review_decision
                    .as_deref()
                    .map(str::to_lowercase)
                    .unwrap_or_else(|| "—".to_string()),
                additions: pr.additions,
                deletions: pr.deletions,
                changed_files: pr.changed_files,
                links: &pr.linked_issues,
                checks: check_views(&pr.checks),
            })
            .collect();
        self.listing("prs", "rows", rows)
    }

    pub fn ci(&self, d: &Dashboard) -> anyhow::Result<String> {
        let branches: Vec<BranchView> = d
            .branches
            .iter()
            .map(|b| BranchView {
                name: &b.name,
                rollup: b.rollup.as_str(),
                sha: b.short_sha(),
                message: &b.message,
                checks: check_views(&b.checks),
            })
            .collect();
        self.listing("ci", "branches", branches)
    }

    pub fn activity(&self, d: &Dashboard, now: DateTime<Utc>) -> anyhow::Result<String> {
        let mut items: Vec<ActivityView> = d
            .deployments
            .iter()
            .map(|dep| ActivityView {
                kind: "deploy",
                active: dep.is_active(),
                name: dep.environment.clone(),
                url: dep.url.clone(),
                detail: format!(
                    "deploy of {}",
                    dep.commit_sha.chars().take(7).collect::<String>()
                ),
                state: dep.state.to_lowercase(),
                when: ago(now, dep.updated_at),
            })
            .collect();
        items.extend(d.workflow_runs.iter().map(|run| ActivityView {
            kind: "run",
            active: run.is_active(),
            name: run.name.clone(),
            url: Some(run.url.clone()),
            detail: format!("on {}", run.branch),
            state: run.conclusion.clone().unwrap_or_else(|| run.status.clone()),
            when: ago(now, run.updated_at),
        }));
        self.listing("activity", "items", items)
    }
}

// ---------------------------------------------------------------------------
// View-models
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PageView {
    title: String,
    fetched: String,
    ago: String,
    regions: Vec<String>,
}

#[derive(Serialize)]
struct SummaryView<'a> {
    error: Option<&'a str>,
    stale: bool,
    has_issues: bool,
    root_count: usize,
    blocked: usize,
    open_prs: usize,
    failing: usize,
}

impl<'a> From<&'a Dashboard> for SummaryView<'a> {
    fn from(d: &'a Dashboard) -> Self {
        let (root_count, blocked) = match &d.issues {
            Some(board) => (
                board.root_count(),
                board
                    .roots
                    .iter()
                    .filter_map(|n| board.arena.get(*n))
                    .filter(|i| i.block_status == BlockStatus::Blocked)
                    .count(),
            ),
            None => (0, 0),
        };
        Self {
            error: d.issue_error.as_deref(),
            stale: d.issues.is_some(),
            has_issues: d.issues.is_some(),
            root_count,
            blocked,
            open_prs: d.pull_requests.len(),
            failing: d
                .pull_requests
                .iter()
                .filter(|p| p.rollup == CiRollup::Failure)
                .count(),
        }
    }
}

#[derive(Serialize)]
struct IssuesView<'a> {
    available: bool,
    rows: Vec<RowView<'a>>,
}

#[derive(Serialize)]
struct RowView<'a> {
    number: u64,
    depth: usize,
    class: String,
    parent: Option<u64>,
    has_children: bool,
    lead: String,
    url: &'a str,
    title: &'a str,
    cells: [CellView<'a>; 3],
    block: &'static str,
    badges: Vec<BadgeView>,
}

#[derive(Serialize)]
struct CellView<'a> {
    issue: u64,
    field: &'static str,
    current: &'static str,
    editable: bool,
    /// The current value is not one of the configured options.
    unlisted: bool,
    options: Vec<OptionView<'a>>,
}

#[derive(Serialize)]
struct OptionView<'a> {
    name: &'a str,
    selected: bool,
}

#[derive(Serialize)]
struct BadgeView {
    class: &'static str,
    number: u64,
    label: String,
}

fn field_cell<'a>(
    field: &'static str,
    fc: &'a FieldConfig,
    issue: &Issue,
    current: &'static str,
) -> CellView<'a> {
    let options: Vec<OptionView<'a>> = fc
        .option_names()
        .map(|name| OptionView {
            name,
            selected: name.eq_ignore_ascii_case(current),
        })
        .collect();
    let editable = !options.is_empty() && !issue.placeholder;
    CellView {
        issue: issue.number,
        field,
        current,
        editable,
        unlisted: editable && !options.iter().any(|o| o.selected),
        options: if editable { options } else { Vec::new() },
    }
}

fn issue_rows<'a>(board: &'a IssueBoard, config: &'a Config) -> Vec<RowView<'a>> {
    board
        .rows
        .iter()
        .filter_map(|row| {
            let issue = board.arena.get(row.number)?;
            Some(RowView {
                number: row.number,
                depth: row.depth,
                class: format!(
                    "row {}{}",
                    issue.block_status.as_str(),
                    if issue.is_open() { "" } else { " closed" }
                ),
                parent: row.parent,
                has_children: row.has_children,
                lead: row.lead(),
                url: &issue.url,
                title: &issue.title,
                cells: [
                    field_cell("status", &config.fields.status, issue, issue.status.as_str()),
                    field_cell("size", &config.fields.size, issue, issue.size.as_str()),
                    field_cell("priority", &config.fields.priority, issue, issue.priority.as_str()),
                ],
                block: issue.block_status.as_str(),
                badges: row
                    .badges
                    .iter()
                    .map(|b| BadgeView {
                        class: b.css_class(),
                        number: b.number(),
                        label: b.label(),
                    })
                    .collect(),
            })
        })
        .collect()
}

#[derive(Serialize, Default)]
struct GraphView<'a> {
    width: f64,
    height: f64,
    edges: Vec<EdgeView<'a>>,
    nodes: Vec<NodeView>,
}

#[derive(Serialize)]
struct EdgeView<'a> {
    from: u64,
    to: u64,
    path: &'a str,
}

#[derive(Serialize)]
struct NodeView {
    number: u64,
    status: &'static str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    text_x: f64,
    text_y: f64,
    label: String,
}

impl<'a> From<&'a Dashboard> for GraphView<'a> {
    fn from(d: &'a Dashboard) -> Self {
        let Some(layout) = d.issues.as_ref().map(|b| &b.graph).filter(|g| !g.is_empty()) else {
            return Self::default();
        };
        Self {
            width: layout.width,
            height: layout.height,
            edges: layout
                .edges
                .iter()
                .map(|e| EdgeView {
                    from: e.from,
                    to: e.to,
                    path: &e.path,
                })
                .collect(),
            nodes: layout
                .nodes
                .iter()
                .map(|n| NodeView {
                    number: n.number,
                    status: n.block_status.as_str(),
                    x: n.x,
                    y: n.y,
                    width: NODE_WIDTH,
                    height: NODE_HEIGHT,
                    text_x: n.x + 8.0,
                    text_y: n.y + NODE_HEIGHT / 2.0 + 4.0,
                    label: n.title.chars().take(TITLE_CHARS).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct CheckView<'a> {
    name: &'a str,
    link: Option<&'a str>,
    rollup: &'static str,
}

fn check_views(checks: &[CiCheck]) -> Vec<CheckView<'_>> {
    checks
        .iter()
        .map(|c| CheckView {
            name: &c.name,
            link: c.link.as_deref(),
            rollup: c.outcome().as_str(),
        })
        .collect()
}

#[derive(Serialize)]
struct PullView<'a> {
    number: u64,
    draft: bool,
    rollup: &'static str,
    url: &'a str,
    title: &'a str,
    branch: &'a str,
    merge: String,
    review: String,
    additions: u64,
    deletions: u64,
    changed_files: u64,
    links: &'a [u64],
    checks: Vec<CheckView<'a>>,
}

#[derive(Serialize)]
struct BranchView<'a> {
    name: &'a str,
    rollup: &'static str,
    sha: &'a str,
    message: &'a str,
    checks: Vec<CheckView<'a>>,
}

#[derive(Serialize)]
struct ActivityView {
    kind: &'static str,
    active: bool,
    name: String,
    url: Option<String>,
    detail: String,
    state: String,
    when: String,
}
