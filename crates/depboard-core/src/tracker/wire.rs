//! Raw response shapes as the tracker returns them, and their one-time
//! conversion into typed entities. Nothing outside this module sees the
//! loosely-typed field-value lists.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::FieldsConfig;
use crate::issue::{ChildRef, DepRef, Issue, IssueRecord, Label};
use crate::signals::{self, BranchSnapshot, CiCheck, CiRollup, Deployment, PullRequest, WorkflowRun};
use crate::types::{IssueState, Priority, Size, Status};

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Pagination info for cursor-based pagination.
#[derive(Debug, Default, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "hasNextPage", default)]
    pub has_next_page: bool,
    #[serde(rename = "endCursor")]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<T>>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            page_info: PageInfo::default(),
            nodes: Vec::new(),
        }
    }
}

impl<T> Connection<T> {
    pub fn into_nodes(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawDep {
    pub number: u64,
    pub state: IssueState,
}

impl From<RawDep> for DepRef {
    fn from(raw: RawDep) -> Self {
        DepRef::new(raw.number, raw.state)
    }
}

// ---------------------------------------------------------------------------
// Project items
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProjectItemsData {
    pub owner: Option<ProjectOwner>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectOwner {
    #[serde(rename = "projectV2")]
    pub project: Option<ProjectNode>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectNode {
    pub items: Connection<RawItem>,
}

#[derive(Debug, Deserialize)]
pub struct RawItem {
    pub id: String,
    #[serde(rename = "fieldValues", default)]
    pub field_values: Connection<RawFieldValue>,
    pub content: Option<RawContent>,
}

/// One entry of an item's field-value list. Values of non single-select
/// fields arrive as empty objects.
#[derive(Debug, Default, Deserialize)]
pub struct RawFieldValue {
    pub name: Option<String>,
    pub field: Option<RawFieldRef>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawFieldRef {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawContent {
    #[serde(rename = "__typename")]
    pub typename: String,
    pub number: Option<u64>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub state: Option<IssueState>,
    #[serde(default)]
    pub labels: Connection<Label>,
    pub parent: Option<RawDep>,
    #[serde(rename = "subIssues", default)]
    pub sub_issues: Connection<RawSubIssue>,
    #[serde(rename = "blockedBy", default)]
    pub blocked_by: Connection<RawDep>,
    #[serde(default)]
    pub blocking: Connection<RawDep>,
}

#[derive(Debug, Deserialize)]
pub struct RawSubIssue {
    pub number: u64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub state: Option<IssueState>,
}

/// Value of the field called `name` in an item's field-value list.
pub fn field_value<'a>(values: &'a [RawFieldValue], name: &str) -> Option<&'a str> {
    values
        .iter()
        .find(|v| {
            v.field
                .as_ref()
                .and_then(|f| f.name.as_deref())
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|v| v.name.as_deref())
}

impl RawItem {
    /// Normalise into a typed issue. Items that are not issues (draft
    /// issues, pull requests) yield `None`.
    pub fn into_record(self, fields: &FieldsConfig) -> Option<IssueRecord> {
        let content = self.content?;
        if content.typename != "Issue" {
            return None;
        }
        let number = content.number?;
        let values: Vec<RawFieldValue> = self.field_values.into_nodes().collect();

        let mut issue = Issue::new(number, content.title.unwrap_or_default());
        issue.url = content.url.unwrap_or_default();
        issue.state = content.state.unwrap_or(IssueState::Open);
        issue.status = field_value(&values, &fields.status.name)
            .map(Status::from_option_name)
            .unwrap_or(Status::Unknown);
        issue.size = field_value(&values, &fields.size.name)
            .map(Size::from_option_name)
            .unwrap_or(Size::Unknown);
        issue.priority = field_value(&values, &fields.priority.name)
            .map(Priority::from_option_name)
            .unwrap_or(Priority::Unknown);
        issue.labels = content.labels.into_nodes().collect();
        issue.parent = content.parent.map(DepRef::from);
        issue.blocked_by = content.blocked_by.into_nodes().map(DepRef::from).collect();
        issue.blocking = content.blocking.into_nodes().map(DepRef::from).collect();
        issue.refresh_block_status();

        let sub_issues = content
            .sub_issues
            .into_nodes()
            .map(|s| ChildRef {
                number: s.number,
                title: s.title,
                url: s.url,
                state: s.state,
            })
            .collect();

        Some(IssueRecord { issue, sub_issues })
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RawRollup {
    pub state: Option<String>,
    #[serde(default)]
    pub contexts: Connection<RawCheckContext>,
}

/// Either a `CheckRun` or a legacy `StatusContext`.
#[derive(Debug, Deserialize)]
pub struct RawCheckContext {
    pub name: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    #[serde(rename = "detailsUrl")]
    pub details_url: Option<String>,
    pub context: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "targetUrl")]
    pub target_url: Option<String>,
}

impl From<RawCheckContext> for CiCheck {
    fn from(raw: RawCheckContext) -> Self {
        match raw.context {
            Some(context) => {
                let state = raw.state.unwrap_or_else(|| "PENDING".to_string());
                let done = !matches!(state.as_str(), "PENDING" | "EXPECTED");
                CiCheck {
                    name: context,
                    status: if done { "COMPLETED".into() } else { "IN_PROGRESS".into() },
                    conclusion: done.then_some(state),
                    link: raw.target_url,
                }
            }
            None => CiCheck {
                name: raw.name.unwrap_or_default(),
                status: raw.status.unwrap_or_default(),
                conclusion: raw.conclusion,
                link: raw.details_url,
            },
        }
    }
}

fn rollup_parts(rollup: Option<RawRollup>) -> (CiRollup, Vec<CiCheck>) {
    match rollup {
        Some(r) => (
            CiRollup::from_state(r.state.as_deref()),
            r.contexts.into_nodes().map(CiCheck::from).collect(),
        ),
        None => (CiRollup::None, Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// Pull requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PullRequestsData {
    pub repository: Option<PullRequestsRepo>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestsRepo {
    #[serde(rename = "pullRequests")]
    pub pull_requests: Connection<RawPullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub body: Option<String>,
    pub head_ref_name: String,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub merge_state_status: Option<String>,
    pub review_decision: Option<String>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
    #[serde(default)]
    pub commits: Connection<RawCommitNode>,
}

#[derive(Debug, Deserialize)]
pub struct RawCommitNode {
    pub commit: RawCommit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommit {
    #[serde(default)]
    pub oid: String,
    #[serde(default)]
    pub message_headline: String,
    pub committed_date: Option<DateTime<Utc>>,
    pub status_check_rollup: Option<RawRollup>,
}

impl From<RawPullRequest> for PullRequest {
    fn from(raw: RawPullRequest) -> Self {
        let rollup = raw
            .commits
            .into_nodes()
            .last()
            .and_then(|c| c.commit.status_check_rollup);
        let (rollup, checks) = rollup_parts(rollup);
        PullRequest {
            linked_issues: signals::linked_issues(raw.body.as_deref().unwrap_or_default()),
            number: raw.number,
            title: raw.title,
            url: raw.url,
            branch: raw.head_ref_name,
            draft: raw.is_draft,
            merge_state: raw.merge_state_status.unwrap_or_else(|| "UNKNOWN".to_string()),
            review_decision: raw.review_decision,
            rollup,
            checks,
            additions: raw.additions,
            deletions: raw.deletions,
            changed_files: raw.changed_files,
        }
    }
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BranchSnapshotsData {
    pub repository: Option<BTreeMap<String, Option<RawRef>>>,
}

#[derive(Debug, Deserialize)]
pub struct RawRef {
    pub name: String,
    pub target: Option<RawCommit>,
}

impl BranchSnapshotsData {
    /// Snapshots in the order the branches were requested. Branches that do
    /// not exist are skipped.
    pub fn into_snapshots(self, requested: &[String]) -> Vec<BranchSnapshot> {
        let mut refs = self.repository.unwrap_or_default();
        requested
            .iter()
            .enumerate()
            .filter_map(|(i, branch)| {
                let raw = refs.remove(&format!("b{i}")).flatten()?;
                let commit = raw.target?;
                let (rollup, checks) = rollup_parts(commit.status_check_rollup);
                Some(BranchSnapshot {
                    name: if raw.name.is_empty() { branch.clone() } else { raw.name },
                    commit_sha: commit.oid,
                    message: commit.message_headline,
                    committed_at: commit.committed_date,
                    rollup,
                    checks,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Deployments / workflow runs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DeploymentsData {
    pub repository: Option<DeploymentsRepo>,
}

#[derive(Debug, Deserialize)]
pub struct DeploymentsRepo {
    pub deployments: Connection<RawDeployment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeployment {
    pub environment: Option<String>,
    pub state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub commit_oid: String,
    pub latest_status: Option<RawDeploymentStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeploymentStatus {
    pub environment_url: Option<String>,
    pub log_url: Option<String>,
}

impl From<RawDeployment> for Deployment {
    fn from(raw: RawDeployment) -> Self {
        let url = raw
            .latest_status
            .and_then(|s| s.environment_url.filter(|u| !u.is_empty()).or(s.log_url));
        Deployment {
            environment: raw.environment.unwrap_or_else(|| "unknown".to_string()),
            state: raw.state.unwrap_or_else(|| "PENDING".to_string()),
            created_at: raw.created_at,
            updated_at: raw.updated_at.unwrap_or(raw.created_at),
            url,
            commit_sha: raw.commit_oid,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WorkflowRunsResponse {
    #[serde(default)]
    pub workflow_runs: Vec<RawWorkflowRun>,
}

#[derive(Debug, Deserialize)]
pub struct RawWorkflowRun {
    pub id: u64,
    pub name: Option<String>,
    pub head_branch: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub html_url: String,
    pub updated_at: DateTime<Utc>,
}

impl From<RawWorkflowRun> for WorkflowRun {
    fn from(raw: RawWorkflowRun) -> Self {
        WorkflowRun {
            id: raw.id,
            name: raw.name.unwrap_or_else(|| "workflow".to_string()),
            branch: raw.head_branch.unwrap_or_default(),
            status: raw.status.unwrap_or_else(|| "queued".to_string()),
            conclusion: raw.conclusion,
            url: raw.html_url,
            updated_at: raw.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Mutation support
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ItemHandleData {
    pub repository: Option<ItemHandleRepo>,
}

#[derive(Debug, Deserialize)]
pub struct ItemHandleRepo {
    pub issue: Option<ItemHandleIssue>,
}

#[derive(Debug, Deserialize)]
pub struct ItemHandleIssue {
    #[serde(rename = "projectItems")]
    pub project_items: Connection<RawProjectItemRef>,
}

#[derive(Debug, Deserialize)]
pub struct RawProjectItemRef {
    pub id: String,
    pub project: RawProjectRef,
}

#[derive(Debug, Deserialize)]
pub struct RawProjectRef {
    pub id: String,
    pub number: u64,
}

impl ItemHandleData {
    /// The item id of this issue inside the given project, if it is in it.
    pub fn item_in_project(self, project_number: u64) -> Option<String> {
        self.repository?
            .issue?
            .project_items
            .into_nodes()
            .find(|i| i.project.number == project_number)
            .map(|i| i.id)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemFieldData {
    #[serde(rename = "updateProjectV2ItemFieldValue")]
    pub update: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
