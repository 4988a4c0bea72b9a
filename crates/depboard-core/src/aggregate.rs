//! Fetches everything the dashboard shows from the tracker and assembles it
//! into one snapshot. The issue list is primary; every other section is
//! auxiliary and degrades to empty on failure.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;

use crate::config::Config;
use crate::error::{DashError, Result};
use crate::graph::{self, ChainView, GraphLayout};
use crate::issue::IssueArena;
use crate::signals::{self, BranchSnapshot, Deployment, PullRequest, WorkflowRun};
use crate::sort::{self, SortVariant, TreeRow};
use crate::tracker::queries;
use crate::tracker::wire::{
    BranchSnapshotsData, DeploymentsData, ProjectItemsData, PullRequestsData, WorkflowRunsResponse,
};
use crate::tracker::TrackerClient;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Issues plus every view derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueBoard {
    pub arena: IssueArena,
    /// Root issue numbers in display order.
    pub roots: Vec<u64>,
    pub rows: Vec<TreeRow>,
    pub graph: GraphLayout,
    pub chains: ChainView,
    pub variant: SortVariant,
}

impl IssueBoard {
    pub fn build(arena: IssueArena, variant: SortVariant) -> Self {
        let roots = sort::sort_roots(&arena, variant);
        let rows = sort::tree_rows(&arena, &roots);
        let graph = graph::layout(&arena, &roots);
        let chains = graph::chains(&arena, &roots);
        Self {
            arena,
            roots,
            rows,
            graph,
            chains,
            variant,
        }
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }
}

/// Result of a fetch where the issue list succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub board: IssueBoard,
    pub pull_requests: Vec<PullRequest>,
    pub branches: Vec<BranchSnapshot>,
    pub deployments: Vec<Deployment>,
    pub workflow_runs: Vec<WorkflowRun>,
    pub fetched_at: DateTime<Utc>,
}

/// What the live view renders. `issues` is `None` when the issue fetch
/// failed; `issue_error` then holds the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub issues: Option<IssueBoard>,
    pub issue_error: Option<String>,
    pub pull_requests: Vec<PullRequest>,
    pub branches: Vec<BranchSnapshot>,
    pub deployments: Vec<Deployment>,
    pub workflow_runs: Vec<WorkflowRun>,
    pub fetched_at: DateTime<Utc>,
}

impl Dashboard {
    pub fn empty() -> Self {
        Self {
            issues: None,
            issue_error: None,
            pull_requests: Vec::new(),
            branches: Vec::new(),
            deployments: Vec::new(),
            workflow_runs: Vec::new(),
            fetched_at: Utc::now(),
        }
    }
}

impl From<Snapshot> for Dashboard {
    fn from(s: Snapshot) -> Self {
        Self {
            issues: Some(s.board),
            issue_error: None,
            pull_requests: s.pull_requests,
            branches: s.branches,
            deployments: s.deployments,
            workflow_runs: s.workflow_runs,
            fetched_at: s.fetched_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Aggregator {
    client: TrackerClient,
    config: Config,
    variant: SortVariant,
}

impl Aggregator {
    pub fn new(client: TrackerClient, config: Config) -> Self {
        Self {
            client,
            config,
            variant: SortVariant::Standard,
        }
    }

    pub fn with_variant(mut self, variant: SortVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn repo_vars(&self) -> serde_json::Value {
        json!({
            "owner": self.config.repository.owner,
            "name": self.config.repository.name,
        })
    }

    fn window(&self) -> Duration {
        Duration::minutes(self.config.sync.recency_window_mins)
    }

    /// Walk every page of the project's items. Pages are requested one at a
    /// time; the first failure aborts the whole walk.
    pub async fn fetch_issues(&self) -> Result<IssueArena> {
        let query = queries::project_items(self.config.project.owner_kind);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 0u32;

        loop {
            page += 1;
            let variables = json!({
                "owner": self.config.project.owner,
                "number": self.config.project.number,
                "pageSize": self.config.page_size,
                "cursor": cursor,
            });
            let data: ProjectItemsData = self.client.graphql(&query, variables).await?;
            let items = data
                .owner
                .and_then(|o| o.project)
                .ok_or_else(|| {
                    DashError::InvalidConfig(format!(
                        "project {}/{} not found",
                        self.config.project.owner, self.config.project.number
                    ))
                })?
                .items;

            let has_next = items.page_info.has_next_page;
            let next_cursor = items.page_info.end_cursor.clone();
            let before = records.len();
            records.extend(
                items
                    .into_nodes()
                    .filter_map(|item| item.into_record(&self.config.fields)),
            );
            tracing::debug!(page, issues = records.len() - before, has_next, "fetched project items page");

            if !has_next {
                break;
            }
            // A page that claims more items must move the cursor forward, or
            // the list would be cut short or walked forever.
            match next_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                Some(_) => {
                    return Err(DashError::GraphQl(vec![format!(
                        "page {page} repeated endCursor with hasNextPage"
                    )]))
                }
                None => {
                    return Err(DashError::GraphQl(vec![format!(
                        "page {page} has hasNextPage without endCursor"
                    )]))
                }
            }
        }

        Ok(IssueArena::from_records(records))
    }

    pub async fn fetch_pull_requests(&self) -> Vec<PullRequest> {
        let result: Result<PullRequestsData> = self
            .client
            .graphql(&queries::pull_requests(), self.repo_vars())
            .await;
        match result {
            Ok(data) => data
                .repository
                .map(|r| r.pull_requests.into_nodes().map(PullRequest::from).collect())
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "pull request fetch failed");
                Vec::new()
            }
        }
    }

    pub async fn fetch_branches(&self) -> Vec<BranchSnapshot> {
        if self.config.branches.is_empty() {
            return Vec::new();
        }
        let query = queries::branch_snapshots(&self.config.branches);
        let result: Result<BranchSnapshotsData> = self.client.graphql(&query, self.repo_vars()).await;
        match result {
            Ok(data) => data.into_snapshots(&self.config.branches),
            Err(e) => {
                tracing::warn!(error = %e, "branch snapshot fetch failed");
                Vec::new()
            }
        }
    }

    pub async fn fetch_deployments(&self) -> Vec<Deployment> {
        let result: Result<DeploymentsData> =
            self.client.graphql(queries::DEPLOYMENTS, self.repo_vars()).await;
        match result {
            Ok(data) => {
                let all = data
                    .repository
                    .map(|r| r.deployments.into_nodes().map(Deployment::from).collect())
                    .unwrap_or_default();
                let mut recent = signals::recent_deployments(all, Utc::now(), self.window());
                recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                recent
            }
            Err(e) => {
                tracing::warn!(error = %e, "deployment fetch failed");
                Vec::new()
            }
        }
    }

    pub async fn fetch_workflow_runs(&self) -> Vec<WorkflowRun> {
        let path = format!(
            "/repos/{}/actions/runs?per_page=30",
            self.config.repository.slug()
        );
        let result: Result<WorkflowRunsResponse> = self.client.rest_get(&path).await;
        match result {
            Ok(data) => {
                let runs = data.workflow_runs.into_iter().map(WorkflowRun::from).collect();
                signals::recent_runs(runs, Utc::now(), self.window())
            }
            Err(e) => {
                tracing::warn!(error = %e, "workflow run fetch failed");
                Vec::new()
            }
        }
    }

    /// Fetch everything concurrently. Fails only when the issue list fails.
    pub async fn fetch_all(&self) -> Result<Snapshot> {
        let (issues, pull_requests, branches, deployments, workflow_runs) = tokio::join!(
            self.fetch_issues(),
            self.fetch_pull_requests(),
            self.fetch_branches(),
            self.fetch_deployments(),
            self.fetch_workflow_runs(),
        );
        Ok(Snapshot {
            board: IssueBoard::build(issues?, self.variant),
            pull_requests,
            branches,
            deployments,
            workflow_runs,
            fetched_at: Utc::now(),
        })
    }

    /// As [`fetch_all`](Self::fetch_all), but an issue failure is recorded
    /// on the dashboard instead of returned.
    pub async fn fetch_dashboard(&self) -> Dashboard {
        let (issues, pull_requests, branches, deployments, workflow_runs) = tokio::join!(
            self.fetch_issues(),
            self.fetch_pull_requests(),
            self.fetch_branches(),
            self.fetch_deployments(),
            self.fetch_workflow_runs(),
        );
        let (issues, issue_error) = match issues {
            Ok(arena) => (Some(IssueBoard::build(arena, self.variant)), None),
            Err(e) => {
                tracing::warn!(error = %e, "issue fetch failed");
                (None, Some(e.to_string()))
            }
        };
        Dashboard {
            issues,
            issue_error,
            pull_requests,
            branches,
            deployments,
            workflow_runs,
            fetched_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockStatus;
    use mockito::{Matcher, ServerGuard};

    fn aggregator(server: &ServerGuard) -> Aggregator {
        let mut config = Config::new("acme", 7, "acme", "widgets");
        config.tracker.graphql_url = format!("{}/graphql", server.url());
        config.tracker.rest_url = server.url();
        let client = TrackerClient::new(
            config.tracker.graphql_url.clone(),
            config.tracker.rest_url.clone(),
            None,
        );
        Aggregator::new(client, config)
    }

    fn issue_node(number: u64, blocking: &[u64], blocked_by: &[u64]) -> serde_json::Value {
        let deps = |ns: &[u64]| {
            ns.iter()
                .map(|n| json!({ "number": n, "state": "OPEN" }))
                .collect::<Vec<_>>()
        };
        json!({
            "id": format!("PVTI_{number}"),
            "fieldValues": { "nodes": [
                { "name": "Backlog", "field": { "name": "Status" } }
            ]},
            "content": {
                "__typename": "Issue",
                "number": number,
                "title": format!("Issue {number}"),
                "url": format!("https://example.test/issues/{number}"),
                "state": "OPEN",
                "blocking": { "nodes": deps(blocking) },
                "blockedBy": { "nodes": deps(blocked_by) }
            }
        })
    }

    fn page(nodes: Vec<serde_json::Value>, next: Option<&str>) -> String {
        json!({
            "data": { "owner": { "projectV2": { "items": {
                "pageInfo": { "hasNextPage": next.is_some(), "endCursor": next },
                "nodes": nodes
            }}}}
        })
        .to_string()
    }

    fn items_mock(server: &mut ServerGuard, cursor: serde_json::Value) -> mockito::Mock {
        server.mock("POST", "/graphql").match_body(Matcher::AllOf(vec![
            Matcher::Regex("ProjectItems".into()),
            Matcher::PartialJson(json!({ "variables": { "cursor": cursor } })),
        ]))
    }

    #[tokio::test]
    async fn pages_are_accumulated_in_order() {
        let mut server = mockito::Server::new_async().await;
        let first = items_mock(&mut server, serde_json::Value::Null)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(vec![issue_node(3, &[5], &[])], Some("c1")))
            .create_async()
            .await;
        let second = items_mock(&mut server, json!("c1"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(vec![issue_node(5, &[], &[3])], None))
            .create_async()
            .await;

        let arena = aggregator(&server).fetch_issues().await.unwrap();
        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(5).unwrap().block_status, BlockStatus::Blocked);
        assert_eq!(arena.get(3).unwrap().block_status, BlockStatus::Blocking);
    }

    #[tokio::test]
    async fn more_pages_without_a_cursor_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "data": { "owner": { "projectV2": { "items": {
                "pageInfo": { "hasNextPage": true, "endCursor": null },
                "nodes": [issue_node(1, &[], &[])]
            }}}}
        });
        items_mock(&mut server, serde_json::Value::Null)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await;

        let err = aggregator(&server).fetch_issues().await.unwrap_err();
        assert!(matches!(err, DashError::GraphQl(_)));
        assert!(err.to_string().contains("endCursor"));
    }

    #[tokio::test]
    async fn repeated_cursor_stops_the_walk() {
        let mut server = mockito::Server::new_async().await;
        items_mock(&mut server, serde_json::Value::Null)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(vec![issue_node(1, &[], &[])], Some("c1")))
            .create_async()
            .await;
        let repeat = items_mock(&mut server, json!("c1"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(vec![issue_node(2, &[], &[])], Some("c1")))
            .expect(1)
            .create_async()
            .await;

        let result = aggregator(&server).fetch_issues().await;
        repeat.assert_async().await;
        assert!(matches!(result, Err(DashError::GraphQl(_))));
    }

    #[tokio::test]
    async fn failing_page_fails_the_issue_fetch() {
        let mut server = mockito::Server::new_async().await;
        items_mock(&mut server, serde_json::Value::Null)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(vec![issue_node(1, &[], &[])], Some("c1")))
            .create_async()
            .await;
        items_mock(&mut server, json!("c1"))
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let agg = aggregator(&server);
        assert!(matches!(
            agg.fetch_issues().await,
            Err(DashError::Api { status: 502, .. })
        ));
        assert!(agg.fetch_all().await.is_err());
    }

    #[tokio::test]
    async fn auxiliary_failures_leave_sections_empty() {
        let mut server = mockito::Server::new_async().await;
        items_mock(&mut server, serde_json::Value::Null)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(vec![issue_node(3, &[5], &[]), issue_node(5, &[], &[3])], None))
            .create_async()
            .await;
        // Everything else hits the server's unmatched-request fallback.

        let snapshot = aggregator(&server).fetch_all().await.unwrap();
        assert_eq!(snapshot.board.roots.len(), 2);
        assert_eq!(snapshot.board.chains.render(), vec!["#3 → #5"]);
        assert!(snapshot.pull_requests.is_empty());
        assert!(snapshot.branches.is_empty());
        assert!(snapshot.deployments.is_empty());
        assert!(snapshot.workflow_runs.is_empty());
    }

    #[tokio::test]
    async fn issue_failure_is_recorded_while_prs_still_render() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/graphql")
            .match_body(Matcher::Regex("ProjectItems".into()))
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        server
            .mock("POST", "/graphql")
            .match_body(Matcher::Regex("query PullRequests".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "data": { "repository": { "pullRequests": { "nodes": [{
                    "number": 40,
                    "title": "Fix the thing",
                    "url": "https://example.test/pull/40",
                    "body": "Closes #3",
                    "headRefName": "fix-thing",
                    "isDraft": false,
                    "mergeStateStatus": "CLEAN",
                    "reviewDecision": null,
                    "additions": 3,
                    "deletions": 1,
                    "changedFiles": 1,
                    "commits": { "nodes": [] }
                }]}}}})
                .to_string(),
            )
            .create_async()
            .await;

        let dashboard = aggregator(&server).fetch_dashboard().await;
        assert!(dashboard.issues.is_none());
        assert!(dashboard.issue_error.unwrap().contains("500"));
        assert_eq!(dashboard.pull_requests.len(), 1);
        assert_eq!(dashboard.pull_requests[0].linked_issues, vec![3]);
    }

    #[tokio::test]
    async fn missing_project_is_a_config_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/graphql")
            .match_body(Matcher::Regex("ProjectItems".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"owner":{"projectV2":null}}}"#)
            .create_async()
            .await;

        let err = aggregator(&server).fetch_issues().await.unwrap_err();
        assert!(matches!(err, DashError::InvalidConfig(_)));
    }
}
