//! Deterministic ordering of issues and the parent/child tree rendering
//! shared by the CLI table and the web view.

use crate::issue::{Issue, IssueArena};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortVariant {
    /// status, block status, priority
    #[default]
    Standard,
    /// as `Standard`, then size (smallest first)
    SizeTieBreak,
}

/// Lexicographic key. Every enum declares its unknown variant last, so
/// unknowns rank after all known values of the same key. The issue number
/// closes the key so the order is strictly total.
pub fn sort_key(issue: &Issue, variant: SortVariant) -> (usize, usize, usize, usize, u64) {
    let size = match variant {
        SortVariant::Standard => 0,
        SortVariant::SizeTieBreak => issue.size.rank(),
    };
    (
        issue.status.rank(),
        issue.block_status.rank(),
        issue.priority.rank(),
        size,
        issue.number,
    )
}

pub fn compare(a: &Issue, b: &Issue, variant: SortVariant) -> Ordering {
    sort_key(a, variant).cmp(&sort_key(b, variant))
}

pub fn sort_issues(issues: &mut [&Issue], variant: SortVariant) {
    issues.sort_by(|a, b| compare(a, b, variant));
}

/// Root issue numbers in display order.
pub fn sort_roots(arena: &IssueArena, variant: SortVariant) -> Vec<u64> {
    let mut roots: Vec<&Issue> = arena
        .roots()
        .into_iter()
        .filter_map(|n| arena.get(n))
        .collect();
    sort_issues(&mut roots, variant);
    roots.into_iter().map(|i| i.number).collect()
}

// ---------------------------------------------------------------------------
// Badges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "number", rename_all = "snake_case")]
pub enum Badge {
    /// Blocked by this still-open issue.
    OpenBlocker(u64),
    /// Was blocked by this issue, which is now closed.
    ResolvedBlocker(u64),
    /// This issue blocks the other one.
    Blocks(u64),
}

impl Badge {
    pub fn number(self) -> u64 {
        match self {
            Badge::OpenBlocker(n) | Badge::ResolvedBlocker(n) | Badge::Blocks(n) => n,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Badge::OpenBlocker(_) => "⛔",
            Badge::ResolvedBlocker(_) => "✓",
            Badge::Blocks(_) => "→",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Badge::OpenBlocker(_) => "dep-open",
            Badge::ResolvedBlocker(_) => "dep-resolved",
            Badge::Blocks(_) => "dep-blocks",
        }
    }

    pub fn label(self) -> String {
        format!("{}#{}", self.glyph(), self.number())
    }
}

pub fn badges(issue: &Issue) -> Vec<Badge> {
    let mut out: Vec<Badge> = issue
        .blocked_by
        .iter()
        .filter(|d| d.state.is_open())
        .map(|d| Badge::OpenBlocker(d.number))
        .collect();
    out.extend(
        issue
            .blocked_by
            .iter()
            .filter(|d| !d.state.is_open())
            .map(|d| Badge::ResolvedBlocker(d.number)),
    );
    out.extend(issue.blocking.iter().map(|d| Badge::Blocks(d.number)));
    out
}

// ---------------------------------------------------------------------------
// Tree rows
// ---------------------------------------------------------------------------

pub const BRANCH_GLYPH: char = '├';
pub const LAST_BRANCH_GLYPH: char = '└';

/// One rendered line of the issue tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    pub number: u64,
    /// 0 for roots.
    pub depth: usize,
    pub parent: Option<u64>,
    /// `├` or `└` for children, `None` for roots.
    pub glyph: Option<char>,
    /// Continuation columns for the ancestors of a nested child.
    pub prefix: String,
    pub has_children: bool,
    pub badges: Vec<Badge>,
}

impl TreeRow {
    /// Indent and branch glyph preceding the title.
    pub fn lead(&self) -> String {
        match self.glyph {
            Some(g) => format!("{}{g} ", self.prefix),
            None => String::new(),
        }
    }
}

/// Render each root followed by its descendants. Children never appear as
/// independent top-level rows.
pub fn tree_rows(arena: &IssueArena, roots: &[u64]) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    for &root in roots {
        let Some(issue) = arena.get(root) else {
            continue;
        };
        let mut visited = HashSet::from([root]);
        rows.push(TreeRow {
            number: root,
            depth: 0,
            parent: None,
            glyph: None,
            prefix: String::new(),
            has_children: !arena.children_of(root).is_empty(),
            badges: badges(issue),
        });
        push_children(arena, root, 1, "", &mut visited, &mut rows);
    }
    rows
}

fn push_children(
    arena: &IssueArena,
    parent: u64,
    depth: usize,
    prefix: &str,
    visited: &mut HashSet<u64>,
    rows: &mut Vec<TreeRow>,
) {
    let children: Vec<&Issue> = arena
        .children_of(parent)
        .into_iter()
        .filter(|c| !visited.contains(&c.number))
        .collect();
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let last = i + 1 == count;
        visited.insert(child.number);
        rows.push(TreeRow {
            number: child.number,
            depth,
            parent: Some(parent),
            glyph: Some(if last { LAST_BRANCH_GLYPH } else { BRANCH_GLYPH }),
            prefix: prefix.to_string(),
            has_children: !arena.children_of(child.number).is_empty(),
            badges: badges(child),
        });
        let next_prefix = format!("{prefix}{}", if last { "  " } else { "│ " });
        push_children(arena, child.number, depth + 1, &next_prefix, visited, rows);
    }
}

/// Number of top-level rows: each root counts once however many children it has.
pub fn root_count(rows: &[TreeRow]) -> usize {
    rows.iter().filter(|r| r.depth == 0).count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{ChildRef, DepRef, IssueRecord};
    use crate::types::{IssueState, Priority, Size, Status};

    fn issue(number: u64, status: Status, priority: Priority, size: Size) -> Issue {
        let mut i = Issue::new(number, format!("Issue {number}"));
        i.status = status;
        i.priority = priority;
        i.size = size;
        i
    }

    fn arena(issues: Vec<Issue>) -> IssueArena {
        issues.into_iter().collect()
    }

    #[test]
    fn status_tier_dominates() {
        let a = arena(vec![
            issue(1, Status::Backlog, Priority::P0, Size::Xs),
            issue(2, Status::InReview, Priority::P3, Size::Xl),
            issue(3, Status::Unknown, Priority::P0, Size::Xs),
            issue(4, Status::InProgress, Priority::Unknown, Size::Unknown),
        ]);
        assert_eq!(sort_roots(&a, SortVariant::Standard), vec![2, 4, 1, 3]);
    }

    #[test]
    fn block_status_orders_within_status() {
        let mut blocker = issue(10, Status::InProgress, Priority::P2, Size::M);
        blocker.blocking = vec![DepRef::new(11, IssueState::Open)];
        let mut blocked = issue(11, Status::InProgress, Priority::P0, Size::M);
        blocked.blocked_by = vec![DepRef::new(10, IssueState::Open)];
        let ready = issue(12, Status::InProgress, Priority::P3, Size::M);
        let a = arena(vec![blocked, ready, blocker]);
        assert_eq!(sort_roots(&a, SortVariant::Standard), vec![10, 12, 11]);
    }

    #[test]
    fn priority_then_size_only_in_size_variant() {
        let a = arena(vec![
            issue(1, Status::Analysis, Priority::P1, Size::Xl),
            issue(2, Status::Analysis, Priority::P1, Size::S),
            issue(3, Status::Analysis, Priority::P0, Size::Xl),
            issue(4, Status::Analysis, Priority::Unknown, Size::Xs),
        ]);
        assert_eq!(sort_roots(&a, SortVariant::Standard), vec![3, 1, 2, 4]);
        assert_eq!(sort_roots(&a, SortVariant::SizeTieBreak), vec![3, 2, 1, 4]);
    }

    #[test]
    fn swapping_priority_never_reorders_status_tiers() {
        let statuses = [Status::InReview, Status::Specification, Status::Backlog, Status::Unknown];
        let priorities = [Priority::P0, Priority::P1, Priority::P2, Priority::P3, Priority::Unknown];
        for (i, &sa) in statuses.iter().enumerate() {
            for &sb in &statuses[i + 1..] {
                for &pa in &priorities {
                    for &pb in &priorities {
                        let a = issue(1, sa, pa, Size::M);
                        let b = issue(2, sb, pb, Size::M);
                        assert_eq!(compare(&a, &b, SortVariant::Standard), Ordering::Less);
                        let a2 = issue(1, sa, pb, Size::M);
                        let b2 = issue(2, sb, pa, Size::M);
                        assert_eq!(compare(&a2, &b2, SortVariant::Standard), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn order_is_strict_and_total() {
        let issues: Vec<Issue> = (1..=40)
            .map(|n| {
                issue(
                    n,
                    Status::all()[(n as usize * 7) % Status::all().len()],
                    Priority::all()[(n as usize * 3) % Priority::all().len()],
                    Size::all()[(n as usize) % Size::all().len()],
                )
            })
            .collect();
        for variant in [SortVariant::Standard, SortVariant::SizeTieBreak] {
            for a in &issues {
                assert_eq!(compare(a, a, variant), Ordering::Equal);
                for b in &issues {
                    if a.number != b.number {
                        assert_ne!(compare(a, b, variant), Ordering::Equal);
                        assert_eq!(compare(a, b, variant), compare(b, a, variant).reverse());
                    }
                }
            }
        }
    }

    #[test]
    fn sort_is_idempotent() {
        let a = arena(vec![
            issue(5, Status::Backlog, Priority::P1, Size::S),
            issue(6, Status::Backlog, Priority::P1, Size::S),
            issue(7, Status::InReview, Priority::P2, Size::L),
        ]);
        let first = sort_roots(&a, SortVariant::Standard);
        let again = sort_roots(&a.clone(), SortVariant::Standard);
        assert_eq!(first, again);
        assert_eq!(first, vec![7, 5, 6]);
    }

    fn tree_fixture() -> IssueArena {
        let rec = |n: u64, children: &[u64]| IssueRecord {
            issue: Issue::new(n, format!("Issue {n}")),
            sub_issues: children.iter().map(|c| ChildRef::number(*c)).collect(),
        };
        IssueArena::from_records(vec![
            rec(1, &[2, 3]),
            rec(2, &[5]),
            rec(3, &[]),
            rec(5, &[]),
            rec(9, &[]),
        ])
    }

    #[test]
    fn tree_marks_last_child_and_nests() {
        let a = tree_fixture();
        let rows = tree_rows(&a, &[1, 9]);
        let summary: Vec<(u64, usize, String)> =
            rows.iter().map(|r| (r.number, r.depth, r.lead())).collect();
        assert_eq!(
            summary,
            vec![
                (1, 0, String::new()),
                (2, 1, "├ ".to_string()),
                (5, 2, "│ └ ".to_string()),
                (3, 1, "└ ".to_string()),
                (9, 0, String::new()),
            ]
        );
        assert!(rows[0].has_children);
        assert_eq!(rows[2].parent, Some(2));
    }

    #[test]
    fn children_never_become_top_level_rows() {
        let a = tree_fixture();
        let roots = sort_roots(&a, SortVariant::Standard);
        assert_eq!(roots.len(), 2);
        let rows = tree_rows(&a, &roots);
        assert_eq!(root_count(&rows), 2);
        for r in rows.iter().filter(|r| r.depth == 0) {
            assert!(roots.contains(&r.number));
        }
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn child_cycles_terminate() {
        let rec = |n: u64, children: &[u64]| IssueRecord {
            issue: Issue::new(n, format!("Issue {n}")),
            sub_issues: children.iter().map(|c| ChildRef::number(*c)).collect(),
        };
        let a = IssueArena::from_records(vec![rec(1, &[2]), rec(2, &[1])]);
        let rows = tree_rows(&a, &[1]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn badges_distinguish_open_resolved_and_outgoing() {
        let mut i = Issue::new(5, "x");
        i.blocked_by = vec![DepRef::new(3, IssueState::Closed), DepRef::new(4, IssueState::Open)];
        i.blocking = vec![DepRef::new(8, IssueState::Open)];
        let b = badges(&i);
        assert_eq!(
            b,
            vec![Badge::OpenBlocker(4), Badge::ResolvedBlocker(3), Badge::Blocks(8)]
        );
        assert_eq!(b[0].label(), "⛔#4");
        assert_ne!(b[0].css_class(), b[1].css_class());
        assert_ne!(b[1].css_class(), b[2].css_class());
    }
}
