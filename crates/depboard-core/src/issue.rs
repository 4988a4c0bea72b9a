use crate::types::{BlockStatus, IssueState, Priority, Size, Status};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// DepRef / Label
// ---------------------------------------------------------------------------

/// One end of a dependency: the other issue's number and whether it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepRef {
    pub number: u64,
    pub state: IssueState,
}

impl DepRef {
    pub fn new(number: u64, state: IssueState) -> Self {
        Self { number, state }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: IssueState,
    pub status: Status,
    pub size: Size,
    pub priority: Priority,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub parent: Option<DepRef>,
    pub blocked_by: Vec<DepRef>,
    pub blocking: Vec<DepRef>,
    /// Child issue numbers, resolved through the arena at render time.
    pub children: Vec<u64>,
    pub block_status: BlockStatus,
    /// Inferred from a sub-issue reference that was not a project item.
    #[serde(default)]
    pub placeholder: bool,
}

impl Issue {
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            url: String::new(),
            state: IssueState::Open,
            status: Status::Unknown,
            size: Size::Unknown,
            priority: Priority::Unknown,
            labels: Vec::new(),
            parent: None,
            blocked_by: Vec::new(),
            blocking: Vec::new(),
            children: Vec::new(),
            block_status: BlockStatus::Ready,
            placeholder: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn refresh_block_status(&mut self) {
        self.block_status = BlockStatus::derive(&self.blocked_by, &self.blocking);
    }

    fn placeholder(child: &ChildRef, parent: DepRef) -> Self {
        let mut issue = Issue::new(
            child.number,
            child.title.clone().unwrap_or_else(|| format!("#{}", child.number)),
        );
        issue.url = child.url.clone().unwrap_or_default();
        issue.state = child.state.unwrap_or(IssueState::Closed);
        issue.parent = Some(parent);
        issue.placeholder = true;
        issue
    }
}

/// A sub-issue as referenced from its parent. Only the number is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    pub number: u64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub state: Option<IssueState>,
}

impl ChildRef {
    pub fn number(number: u64) -> Self {
        Self {
            number,
            title: None,
            url: None,
            state: None,
        }
    }
}

/// A normalised project item before parent/child resolution.
#[derive(Debug, Clone)]
pub struct IssueRecord {
    pub issue: Issue,
    pub sub_issues: Vec<ChildRef>,
}

// ---------------------------------------------------------------------------
// IssueArena
// ---------------------------------------------------------------------------

/// Flat store of every fetched issue keyed by number. Parent/child links are
/// number lists, so no issue owns another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueArena {
    issues: BTreeMap<u64, Issue>,
}

impl IssueArena {
    /// Build the arena from a complete fetch, attaching children by number.
    ///
    /// Sub-issue references that are not themselves project items become
    /// placeholder issues rather than being dropped. Block status is derived
    /// once here for every issue.
    pub fn from_records(records: Vec<IssueRecord>) -> Self {
        let mut issues: BTreeMap<u64, Issue> = BTreeMap::new();
        let mut links: Vec<(DepRef, Vec<ChildRef>)> = Vec::new();

        for record in records {
            let parent = DepRef::new(record.issue.number, record.issue.state);
            links.push((parent, record.sub_issues));
            issues.insert(record.issue.number, record.issue);
        }

        for (parent, children) in &links {
            for child in children {
                issues
                    .entry(child.number)
                    .and_modify(|c| {
                        if c.parent.is_none() {
                            c.parent = Some(*parent);
                        }
                    })
                    .or_insert_with(|| Issue::placeholder(child, *parent));
                if let Some(p) = issues.get_mut(&parent.number) {
                    if !p.children.contains(&child.number) {
                        p.children.push(child.number);
                    }
                }
            }
        }

        // Children that named their parent but were missing from the parent's
        // (possibly truncated) sub-issue list.
        let back_links: Vec<(u64, u64)> = issues
            .values()
            .filter_map(|i| i.parent.map(|p| (p.number, i.number)))
            .collect();
        for (parent, child) in back_links {
            if let Some(p) = issues.get_mut(&parent) {
                if !p.children.contains(&child) {
                    p.children.push(child);
                }
            }
        }

        for issue in issues.values_mut() {
            issue.refresh_block_status();
        }

        Self { issues }
    }

    pub fn get(&self, number: u64) -> Option<&Issue> {
        self.issues.get(&number)
    }

    pub fn contains(&self, number: u64) -> bool {
        self.issues.contains_key(&number)
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.values()
    }

    /// Resolved children of `number`, in the order the tracker listed them.
    pub fn children_of(&self, number: u64) -> Vec<&Issue> {
        self.get(number)
            .map(|i| i.children.iter().filter_map(|c| self.get(*c)).collect())
            .unwrap_or_default()
    }

    /// Whether `issue` has an open parent tracked in this arena.
    pub fn has_open_parent(&self, issue: &Issue) -> bool {
        match issue.parent {
            Some(p) => self.get(p.number).is_some_and(|parent| parent.is_open()),
            None => false,
        }
    }

    /// An open issue with no open parent. A closed parent promotes its
    /// children to roots.
    pub fn is_root(&self, issue: &Issue) -> bool {
        issue.is_open() && !self.has_open_parent(issue)
    }

    /// Root issue numbers in ascending order.
    pub fn roots(&self) -> Vec<u64> {
        self.issues
            .values()
            .filter(|i| self.is_root(i))
            .map(|i| i.number)
            .collect()
    }
}

impl FromIterator<Issue> for IssueArena {
    fn from_iter<T: IntoIterator<Item = Issue>>(iter: T) -> Self {
        Self::from_records(
            iter.into_iter()
                .map(|issue| IssueRecord {
                    issue,
                    sub_issues: Vec::new(),
                })
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
