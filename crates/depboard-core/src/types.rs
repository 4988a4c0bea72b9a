use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// IssueState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn is_open(self) -> bool {
        self == IssueState::Open
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Workflow stage of an issue, declared in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    InReview,
    InProgress,
    Specification,
    Analysis,
    Backlog,
    Done,
    Unknown,
}

impl Status {
    pub fn all() -> &'static [Status] {
        &[
            Status::InReview,
            Status::InProgress,
            Status::Specification,
            Status::Analysis,
            Status::Backlog,
            Status::Done,
        ]
    }

    pub fn rank(self) -> usize {
        self as usize
    }

    /// Map a tracker option name onto a known stage. Never fails.
    pub fn from_option_name(name: &str) -> Status {
        match normalize(name).as_str() {
            "in review" | "review" => Status::InReview,
            "in progress" | "doing" => Status::InProgress,
            "specification" | "spec" => Status::Specification,
            "analysis" => Status::Analysis,
            "backlog" | "todo" => Status::Backlog,
            "done" => Status::Done,
            _ => Status::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::InReview => "In review",
            Status::InProgress => "In progress",
            Status::Specification => "Specification",
            Status::Analysis => "Analysis",
            Status::Backlog => "Backlog",
            Status::Done => "Done",
            Status::Unknown => "—",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Size
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    Xs,
    S,
    M,
    L,
    Xl,
    Unknown,
}

impl Size {
    pub fn all() -> &'static [Size] {
        &[Size::Xs, Size::S, Size::M, Size::L, Size::Xl]
    }

    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn from_option_name(name: &str) -> Size {
        match leading_token(name).as_str() {
            "xs" => Size::Xs,
            "s" => Size::S,
            "m" => Size::M,
            "l" => Size::L,
            "xl" => Size::Xl,
            _ => Size::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Size::Xs => "XS",
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::Xl => "XL",
            Size::Unknown => "—",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
    Unknown,
}

impl Priority {
    pub fn all() -> &'static [Priority] {
        &[Priority::P0, Priority::P1, Priority::P2, Priority::P3]
    }

    pub fn rank(self) -> usize {
        self as usize
    }

    /// Accepts `P1`, `p1`, `P1 - High` and similar.
    pub fn from_option_name(name: &str) -> Priority {
        match leading_token(name).as_str() {
            "p0" => Priority::P0,
            "p1" => Priority::P1,
            "p2" => Priority::P2,
            "p3" => Priority::P3,
            _ => Priority::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::Unknown => "—",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BlockStatus
// ---------------------------------------------------------------------------

/// Derived dependency state. Declared in table order: blocking issues first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Blocking,
    Ready,
    Blocked,
}

impl BlockStatus {
    /// `blocked` iff any blocker is still open, else `blocking` iff this issue
    /// blocks anything, else `ready`.
    pub fn derive(blocked_by: &[crate::issue::DepRef], blocking: &[crate::issue::DepRef]) -> Self {
        if blocked_by.iter().any(|d| d.state.is_open()) {
            BlockStatus::Blocked
        } else if !blocking.is_empty() {
            BlockStatus::Blocking
        } else {
            BlockStatus::Ready
        }
    }

    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockStatus::Blocking => "blocking",
            BlockStatus::Ready => "ready",
            BlockStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn leading_token(name: &str) -> String {
    normalize(name)
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
