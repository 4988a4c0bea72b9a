//! Root-to-root "blocks" graph: layered layout for the SVG view and a
//! topological chain listing for text output.

use crate::issue::IssueArena;
use crate::types::BlockStatus;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};

pub const NODE_WIDTH: f64 = 180.0;
pub const NODE_HEIGHT: f64 = 44.0;
pub const H_GAP: f64 = 80.0;
pub const V_GAP: f64 = 16.0;
pub const PADDING: f64 = 20.0;

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// `from` blocks `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub from: u64,
    pub to: u64,
}

/// Blocking relations whose both ends are roots, from either side of the
/// relation, deduplicated. Edges into children are dropped.
pub fn root_edges(arena: &IssueArena, roots: &[u64]) -> Vec<Edge> {
    let root_set: HashSet<u64> = roots.iter().copied().collect();
    let mut edges = BTreeSet::new();
    for &root in roots {
        let Some(issue) = arena.get(root) else {
            continue;
        };
        for dep in &issue.blocking {
            if dep.number != root && root_set.contains(&dep.number) {
                edges.insert(Edge { from: root, to: dep.number });
            }
        }
        for dep in &issue.blocked_by {
            if dep.number != root && root_set.contains(&dep.number) {
                edges.insert(Edge { from: dep.number, to: root });
            }
        }
    }
    edges.into_iter().collect()
}

/// Nodes touched by at least one edge, in the order of `roots`.
fn participants(roots: &[u64], edges: &[Edge]) -> Vec<u64> {
    let touched: HashSet<u64> = edges.iter().flat_map(|e| [e.from, e.to]).collect();
    roots.iter().copied().filter(|n| touched.contains(n)).collect()
}

fn adjacency(nodes: &[u64], edges: &[Edge]) -> (HashMap<u64, Vec<u64>>, HashMap<u64, usize>) {
    let mut succ: HashMap<u64, Vec<u64>> = nodes.iter().map(|n| (*n, Vec::new())).collect();
    let mut indeg: HashMap<u64, usize> = nodes.iter().map(|n| (*n, 0)).collect();
    for e in edges {
        if let Some(s) = succ.get_mut(&e.from) {
            s.push(e.to);
        }
        if let Some(d) = indeg.get_mut(&e.to) {
            *d += 1;
        }
    }
    (succ, indeg)
}

// ---------------------------------------------------------------------------
// Layering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layering {
    pub layer: HashMap<u64, usize>,
    /// Nodes in the order they were first finalised.
    pub discovery: Vec<u64>,
}

/// Longest-path layering: sources sit in layer 0 and every node sits one
/// past its deepest predecessor. Nodes stuck in a cycle are never released
/// by the queue and fall back to layer 0.
pub fn assign_layers(nodes: &[u64], edges: &[Edge]) -> Layering {
    let (succ, mut indeg) = adjacency(nodes, edges);
    let mut layer: HashMap<u64, usize> = nodes.iter().map(|n| (*n, 0)).collect();
    let mut queue: VecDeque<u64> = nodes.iter().copied().filter(|n| indeg[n] == 0).collect();
    let mut discovery = Vec::with_capacity(nodes.len());

    while let Some(u) = queue.pop_front() {
        discovery.push(u);
        let next = layer[&u] + 1;
        for v in &succ[&u] {
            if let Some(l) = layer.get_mut(v) {
                *l = (*l).max(next);
            }
            if let Some(d) = indeg.get_mut(v) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(*v);
                }
            }
        }
    }

    if discovery.len() < nodes.len() {
        let done: HashSet<u64> = discovery.iter().copied().collect();
        for n in nodes {
            if !done.contains(n) {
                tracing::warn!(issue = n, "dependency cycle among root issues; placing in layer 0");
                layer.insert(*n, 0);
                discovery.push(*n);
            }
        }
    }

    Layering { layer, discovery }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub number: u64,
    pub title: String,
    pub block_status: BlockStatus,
    /// Root issues this node blocks.
    pub blocks: Vec<u64>,
    pub layer: usize,
    pub row: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub from: u64,
    pub to: u64,
    /// SVG path data for a cubic curve between the two boxes.
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphLayout {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub width: f64,
    pub height: f64,
}

impl GraphLayout {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, number: u64) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.number == number)
    }
}

fn stack_height(count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    count as f64 * NODE_HEIGHT + (count - 1) as f64 * V_GAP
}

/// Curve from the right-middle of the source box to the left-middle of the
/// target box.
pub fn edge_path(from: (f64, f64), to: (f64, f64)) -> String {
    let (x1, y1) = (from.0 + NODE_WIDTH, from.1 + NODE_HEIGHT / 2.0);
    let (x2, y2) = (to.0, to.1 + NODE_HEIGHT / 2.0);
    let dx = (x2 - x1) / 2.0;
    format!(
        "M{x1:.1} {y1:.1} C{:.1} {y1:.1}, {:.1} {y2:.1}, {x2:.1} {y2:.1}",
        x1 + dx,
        x2 - dx
    )
}

/// Lay out the roots that take part in at least one root-to-root blocking
/// relation. `roots` should already be in display order; it fixes the
/// vertical order inside each layer.
pub fn layout(arena: &IssueArena, roots: &[u64]) -> GraphLayout {
    let edges = root_edges(arena, roots);
    let nodes = participants(roots, &edges);
    if nodes.is_empty() {
        return GraphLayout::default();
    }

    let layering = assign_layers(&nodes, &edges);
    let layer_count = layering.layer.values().max().map_or(0, |m| m + 1);
    let mut columns: Vec<Vec<u64>> = vec![Vec::new(); layer_count];
    for n in &layering.discovery {
        columns[layering.layer[n]].push(*n);
    }
    let tallest = stack_height(columns.iter().map(Vec::len).max().unwrap_or(0));

    let mut positioned = Vec::with_capacity(nodes.len());
    for (layer, column) in columns.iter().enumerate() {
        let offset = (tallest - stack_height(column.len())) / 2.0;
        for (row, &number) in column.iter().enumerate() {
            let Some(issue) = arena.get(number) else {
                continue;
            };
            positioned.push(GraphNode {
                number,
                title: issue.title.clone(),
                block_status: issue.block_status,
                blocks: edges.iter().filter(|e| e.from == number).map(|e| e.to).collect(),
                layer,
                row,
                x: PADDING + layer as f64 * (NODE_WIDTH + H_GAP),
                y: PADDING + offset + row as f64 * (NODE_HEIGHT + V_GAP),
            });
        }
    }

    let position: HashMap<u64, (f64, f64)> =
        positioned.iter().map(|n| (n.number, (n.x, n.y))).collect();
    let graph_edges = edges
        .iter()
        .filter_map(|e| {
            let from = position.get(&e.from)?;
            let to = position.get(&e.to)?;
            Some(GraphEdge {
                from: e.from,
                to: e.to,
                path: edge_path(*from, *to),
            })
        })
        .collect();

    GraphLayout {
        nodes: positioned,
        edges: graph_edges,
        width: PADDING * 2.0
            + layer_count as f64 * NODE_WIDTH
            + layer_count.saturating_sub(1) as f64 * H_GAP,
        height: PADDING * 2.0 + tallest,
    }
}

// ---------------------------------------------------------------------------
// Chains
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainView {
    /// Topological order, ties broken by ascending issue number.
    pub order: Vec<u64>,
    /// Human-readable paths through `order`. A chain may open with an
    /// already-listed predecessor to show where it hangs off.
    pub chains: Vec<Vec<u64>>,
}

impl ChainView {
    pub fn render(&self) -> Vec<String> {
        self.chains
            .iter()
            .map(|c| {
                c.iter()
                    .map(|n| format!("#{n}"))
                    .collect::<Vec<_>>()
                    .join(" → ")
            })
            .collect()
    }
}

/// Kahn's algorithm over the root-to-root edge set, smallest number first.
pub fn topo_order(nodes: &[u64], edges: &[Edge]) -> Vec<u64> {
    let (succ, mut indeg) = adjacency(nodes, edges);
    let mut heap: BinaryHeap<Reverse<u64>> = nodes
        .iter()
        .filter(|n| indeg[*n] == 0)
        .map(|n| Reverse(*n))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(Reverse(u)) = heap.pop() {
        order.push(u);
        for v in &succ[&u] {
            if let Some(d) = indeg.get_mut(v) {
                *d -= 1;
                if *d == 0 {
                    heap.push(Reverse(*v));
                }
            }
        }
    }

    if order.len() < nodes.len() {
        let done: HashSet<u64> = order.iter().copied().collect();
        let mut rest: Vec<u64> = nodes.iter().copied().filter(|n| !done.contains(n)).collect();
        rest.sort_unstable();
        order.extend(rest);
    }
    order
}

pub fn chains(arena: &IssueArena, roots: &[u64]) -> ChainView {
    let edges = root_edges(arena, roots);
    let mut nodes = participants(roots, &edges);
    nodes.sort_unstable();
    let order = topo_order(&nodes, &edges);

    let mut preds: HashMap<u64, Vec<u64>> = HashMap::new();
    let mut succs: HashMap<u64, Vec<u64>> = HashMap::new();
    for e in &edges {
        preds.entry(e.to).or_default().push(e.from);
        succs.entry(e.from).or_default().push(e.to);
    }

    let mut placed: HashSet<u64> = HashSet::new();
    let mut out = Vec::new();
    for &start in &order {
        if placed.contains(&start) {
            continue;
        }
        let mut chain = Vec::new();
        if let Some(anchor) = preds
            .get(&start)
            .and_then(|p| p.iter().filter(|p| placed.contains(p)).min())
        {
            chain.push(*anchor);
        }
        chain.push(start);
        placed.insert(start);

        let mut current = start;
        // Extend only into successors whose blockers are all listed, so the
        // first appearance of every node stays in topological order.
        while let Some(next) = succs.get(&current).and_then(|s| {
            s.iter()
                .copied()
                .filter(|v| !placed.contains(v))
                .filter(|v| {
                    preds
                        .get(v)
                        .map_or(true, |p| p.iter().all(|x| placed.contains(x)))
                })
                .min()
        }) {
            chain.push(next);
            placed.insert(next);
            current = next;
        }
        out.push(chain);
    }

    ChainView { order, chains: out }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
