//! Auxiliary dashboard data: pull requests, branch CI, deployments and
//! workflow runs. All of it is best-effort and rebuilt every pass.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// CI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiCheck {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub link: Option<String>,
}

impl CiCheck {
    pub fn outcome(&self) -> CiRollup {
        match self.conclusion.as_deref().map(str::to_ascii_uppercase).as_deref() {
            Some("SUCCESS") | Some("NEUTRAL") | Some("SKIPPED") => CiRollup::Success,
            Some("FAILURE") | Some("ERROR") | Some("TIMED_OUT") | Some("CANCELLED")
            | Some("ACTION_REQUIRED") | Some("STARTUP_FAILURE") => CiRollup::Failure,
            Some(_) => CiRollup::Pending,
            None => CiRollup::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiRollup {
    Success,
    Failure,
    Pending,
    None,
}

impl CiRollup {
    /// Map a tracker rollup state (`SUCCESS`, `FAILURE`, `PENDING`, ...).
    pub fn from_state(state: Option<&str>) -> Self {
        match state.map(str::to_ascii_uppercase).as_deref() {
            Some("SUCCESS") => CiRollup::Success,
            Some("FAILURE") | Some("ERROR") => CiRollup::Failure,
            Some("PENDING") | Some("EXPECTED") => CiRollup::Pending,
            _ => CiRollup::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CiRollup::Success => "success",
            CiRollup::Failure => "failure",
            CiRollup::Pending => "pending",
            CiRollup::None => "none",
        }
    }
}

// ---------------------------------------------------------------------------
// PullRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub branch: String,
    pub draft: bool,
    pub merge_state: String,
    pub review_decision: Option<String>,
    pub rollup: CiRollup,
    pub checks: Vec<CiCheck>,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    /// Issues this PR closes, from closing keywords in its body.
    pub linked_issues: Vec<u64>,
}

fn closing_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?)\s*:?\s+#(\d+)")
            .expect("valid closing-keyword regex")
    })
}

/// Issue numbers referenced with a closing keyword, deduplicated in order.
pub fn linked_issues(body: &str) -> Vec<u64> {
    let mut out = Vec::new();
    for cap in closing_keyword_re().captures_iter(body) {
        if let Ok(n) = cap[1].parse::<u64>() {
            if !out.contains(&n) {
                out.push(n);
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// BranchSnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSnapshot {
    pub name: String,
    pub commit_sha: String,
    pub message: String,
    pub committed_at: Option<DateTime<Utc>>,
    pub rollup: CiRollup,
    pub checks: Vec<CiCheck>,
}

impl BranchSnapshot {
    pub fn short_sha(&self) -> &str {
        &self.commit_sha[..self.commit_sha.len().min(7)]
    }
}

// ---------------------------------------------------------------------------
// Deployment / WorkflowRun
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub environment: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub url: Option<String>,
    pub commit_sha: String,
}

impl Deployment {
    pub fn is_active(&self) -> bool {
        matches!(
            self.state.to_ascii_uppercase().as_str(),
            "IN_PROGRESS" | "QUEUED" | "PENDING" | "WAITING"
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub name: String,
    pub branch: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub url: String,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub fn is_active(&self) -> bool {
        self.status != "completed"
    }
}

/// Keep deployments that are running or were updated inside the window.
pub fn recent_deployments(
    deployments: Vec<Deployment>,
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<Deployment> {
    deployments
        .into_iter()
        .filter(|d| d.is_active() || now - d.updated_at <= window)
        .collect()
}

/// Keep workflow runs that are running or finished inside the window.
pub fn recent_runs(runs: Vec<WorkflowRun>, now: DateTime<Utc>, window: Duration) -> Vec<WorkflowRun> {
    runs.into_iter()
        .filter(|r| r.is_active() || now - r.updated_at <= window)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_keywords_are_linked() {
        let body = "Fixes #12 and closes #3.\nAlso resolves: #12, refs #99";
        assert_eq!(linked_issues(body), vec![12, 3]);
        assert!(linked_issues("mentions #4 without a keyword").is_empty());
    }

    #[test]
    fn check_outcome_from_conclusion() {
        let mut check = CiCheck {
            name: "test".into(),
            status: "COMPLETED".into(),
            conclusion: Some("FAILURE".into()),
            link: None,
        };
        assert_eq!(check.outcome(), CiRollup::Failure);
        check.conclusion = Some("success".into());
        assert_eq!(check.outcome(), CiRollup::Success);
        check.conclusion = None;
        assert_eq!(check.outcome(), CiRollup::Pending);
    }

    #[test]
    fn runs_outside_window_disappear() {
        let now = Utc::now();
        let run = |id: u64, status: &str, mins_ago: i64| WorkflowRun {
            id,
            name: "ci".into(),
            branch: "main".into(),
            status: status.into(),
            conclusion: None,
            url: String::new(),
            updated_at: now - Duration::minutes(mins_ago),
        };
        let kept = recent_runs(
            vec![run(1, "completed", 2), run(2, "completed", 30), run(3, "in_progress", 90)],
            now,
            Duration::minutes(10),
        );
        let ids: Vec<u64> = kept.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn active_deployments_survive_window() {
        let now = Utc::now();
        let old = now - Duration::hours(2);
        let dep = |state: &str| Deployment {
            environment: "production".into(),
            state: state.into(),
            created_at: old,
            updated_at: old,
            url: None,
            commit_sha: "abc".into(),
        };
        let kept = recent_deployments(vec![dep("IN_PROGRESS"), dep("SUCCESS")], now, Duration::minutes(10));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].state, "IN_PROGRESS");
    }
}
