//! BFS, DFS and Dijkstra over a [`Graph`], recorded as a replayable trace.
//!
//! Neighbours are always taken in edge insertion order and Dijkstra breaks
//! distance ties by ascending node id, so a given graph and configuration
//! always produce the same trace.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::graph::{EdgeIndex, Graph, NodeId};
use crate::trace::{AlgorithmStep, Recorder, Trace};

pub type GraphStep = AlgorithmStep<NodeId, EdgeIndex>;
pub type GraphTrace = Trace<NodeId, EdgeIndex, TraversalSummary>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Bfs,
    Dfs,
    Dijkstra,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Algorithm::Bfs => "bfs",
            Algorithm::Dfs => "dfs",
            Algorithm::Dijkstra => "dijkstra",
        })
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bfs" => Ok(Algorithm::Bfs),
            "dfs" => Ok(Algorithm::Dfs),
            "dijkstra" => Ok(Algorithm::Dijkstra),
            other => Err(format!("unknown algorithm `{}` (expected bfs, dfs or dijkstra)", other)),
        }
    }
}

/// Tentative or final distance; `Infinite` means not reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Option<u64>", into = "Option<u64>")]
pub enum Distance {
    Finite(u64),
    Infinite,
}

impl Distance {
    pub fn is_finite(self) -> bool {
        matches!(self, Distance::Finite(_))
    }

    pub fn finite(self) -> Option<u64> {
        match self {
            Distance::Finite(d) => Some(d),
            Distance::Infinite => None,
        }
    }
}

impl From<Option<u64>> for Distance {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Distance::Infinite, Distance::Finite)
    }
}

impl From<Distance> for Option<u64> {
    fn from(value: Distance) -> Self {
        value.finite()
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Finite(d) => write!(f, "{}", d),
            Distance::Infinite => f.write_str("inf"),
        }
    }
}

/// Traversal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TraversalConfig {
    pub algorithm: Algorithm,
    /// Stop once this node is visited and reconstruct the path to it
    pub target: Option<NodeId>,
    /// Maximum number of recorded trace steps
    pub max_steps: usize,
    /// Maximum node ids across all frontier snapshots and the path
    pub max_frontier_entries: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Dijkstra,
            target: None,
            max_steps: 100_000,
            max_frontier_entries: 1_000_000,
        }
    }
}

/// Result of a traversal.
///
/// For BFS the distances are hop counts, for DFS depths in the DFS tree,
/// for Dijkstra weighted shortest distances. `parents` is the traversal
/// (or shortest-path) tree.
///
/// Only visited nodes carry a distance and a parent, so every reported value
/// is final. When the run stopped at its target, unvisited nodes report
/// [`Distance::Infinite`] without being proven unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalSummary {
    pub algorithm: Algorithm,
    pub source: NodeId,
    pub target: Option<NodeId>,
    pub visit_order: Vec<NodeId>,
    pub distances: BTreeMap<NodeId, Distance>,
    pub parents: BTreeMap<NodeId, NodeId>,
    /// The run ended early because the target was visited
    pub stopped_at_target: bool,
    /// Path from source to target; absent without a target or when the
    /// target was not reached
    pub path: Option<Vec<NodeId>>,
}

impl TraversalSummary {
    pub fn distance(&self, id: &NodeId) -> Distance {
        self.distances.get(id).copied().unwrap_or(Distance::Infinite)
    }

    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.parents.get(id)
    }
}

/// Per-call traversal state, indexed by node position in the graph.
struct Run<'g> {
    graph: &'g Graph,
    distances: Vec<Option<u64>>,
    parents: Vec<Option<usize>>,
    visited: Vec<bool>,
    visit_order: Vec<usize>,
    target: Option<usize>,
    recorder: Recorder<NodeId, EdgeIndex>,
}

impl<'g> Run<'g> {
    fn new(
        graph: &'g Graph,
        source: usize,
        target: Option<usize>,
        recorder: Recorder<NodeId, EdgeIndex>,
    ) -> Self {
        let n = graph.node_count();
        let mut distances = vec![None; n];
        distances[source] = Some(0);
        Self {
            graph,
            distances,
            parents: vec![None; n],
            visited: vec![false; n],
            visit_order: Vec::new(),
            target,
            recorder,
        }
    }

    fn id(&self, node: usize) -> NodeId {
        self.graph.nodes()[node].clone()
    }

    fn ids(&self, nodes: impl IntoIterator<Item = usize>) -> Vec<NodeId> {
        nodes.into_iter().map(|node| self.id(node)).collect()
    }

    /// Mark visited; returns true when this was the target.
    fn visit(&mut self, node: usize) -> Result<bool> {
        self.visited[node] = true;
        self.visit_order.push(node);
        let id = self.id(node);
        self.recorder.record(AlgorithmStep::NodeVisited { id })?;
        Ok(self.target == Some(node))
    }

    fn relax(&mut self, from: usize, to: usize, distance: u64, via: EdgeIndex) -> Result<()> {
        self.distances[to] = Some(distance);
        self.parents[to] = Some(from);
        let step = AlgorithmStep::EdgeRelaxed {
            from: self.id(from),
            to: self.id(to),
            new_distance: distance,
            via,
        };
        self.recorder.record(step)
    }

    fn frontier(&mut self, pending: Vec<usize>) -> Result<()> {
        let ids = self.ids(pending);
        self.recorder.record(AlgorithmStep::FrontierUpdated { ids })
    }

    fn bfs(&mut self, source: usize) -> Result<()> {
        let graph = self.graph;
        let mut queue = VecDeque::from([source]);
        self.frontier(vec![source])?;

        while let Some(node) = queue.pop_front() {
            if self.visit(node)? {
                break;
            }
            let hops = self.distances[node].unwrap_or(0) + 1;
            for &edge in graph.out_edges(node) {
                let (next, _) = graph.head(edge);
                if self.distances[next].is_none() {
                    self.relax(node, next, hops, edge)?;
                    queue.push_back(next);
                }
            }
            self.frontier(queue.iter().copied().collect())?;
        }
        Ok(())
    }

    fn dfs(&mut self, source: usize) -> Result<()> {
        let graph = self.graph;
        // (node, tree edge that discovered it, depth)
        let mut stack: Vec<(usize, Option<(usize, EdgeIndex)>, u64)> = vec![(source, None, 0)];
        let mut seen = vec![false; graph.node_count()];
        self.frontier(vec![source])?;

        while let Some((node, tree_edge, depth)) = stack.pop() {
            if self.visited[node] {
                continue;
            }
            if let Some((parent, edge)) = tree_edge {
                self.relax(parent, node, depth, edge)?;
            }
            if self.visit(node)? {
                break;
            }
            for &edge in graph.out_edges(node).iter().rev() {
                let (next, _) = graph.head(edge);
                if !self.visited[next] {
                    stack.push((next, Some((node, edge)), depth + 1));
                }
            }

            // Top-first, each pending node once
            let mut pending = Vec::new();
            for &(next, _, _) in stack.iter().rev() {
                if !self.visited[next] && !seen[next] {
                    seen[next] = true;
                    pending.push(next);
                }
            }
            for &next in &pending {
                seen[next] = false;
            }
            self.frontier(pending)?;
        }
        Ok(())
    }

    fn dijkstra(&mut self, source: usize) -> Result<()> {
        let graph = self.graph;
        // Rank of each node in ascending id order, for tie-breaking
        let mut order: Vec<usize> = (0..graph.node_count()).collect();
        order.sort_by(|&a, &b| graph.nodes()[a].cmp(&graph.nodes()[b]));
        let mut rank = vec![0; order.len()];
        for (position, &node) in order.iter().enumerate() {
            rank[node] = position;
        }

        // Unvisited nodes with a tentative distance, in selection order
        let mut pending = BTreeSet::from([(0u64, rank[source], source)]);
        self.frontier(vec![source])?;

        while let Some((distance, _, node)) = pending.pop_first() {
            if self.visit(node)? {
                break;
            }
            for &edge in graph.out_edges(node) {
                let (next, weight) = graph.head(edge);
                if self.visited[next] {
                    continue;
                }
                let candidate = distance.checked_add(weight).ok_or_else(|| {
                    EngineError::invalid_graph(format!(
                        "distance to `{}` overflows u64",
                        graph.nodes()[next]
                    ))
                })?;
                match self.distances[next] {
                    Some(current) if current <= candidate => continue,
                    Some(current) => {
                        pending.remove(&(current, rank[next], next));
                    }
                    None => {}
                }
                self.relax(node, next, candidate, edge)?;
                pending.insert((candidate, rank[next], next));
            }
            self.frontier(pending.iter().map(|&(_, _, n)| n).collect())?;
        }
        Ok(())
    }

    /// Parent chain from the source to `target`, if it was visited.
    fn path_to(&self, target: usize) -> Option<Vec<usize>> {
        if !self.visited[target] {
            return None;
        }
        let mut path = vec![target];
        let mut at = target;
        while let Some(parent) = self.parents[at] {
            path.push(parent);
            at = parent;
        }
        path.reverse();
        Some(path)
    }
}

/// Traverse `graph` from `source` with the configured algorithm.
///
/// An unreachable target is not an error: the trace completes, the target's
/// distance is [`Distance::Infinite`] and no path is reported.
pub fn run(graph: &Graph, source: &NodeId, config: &TraversalConfig) -> Result<GraphTrace> {
    let start = graph
        .index_of(source)
        .ok_or_else(|| EngineError::UnknownNode(source.clone()))?;
    let target = config
        .target
        .as_ref()
        .map(|id| {
            graph
                .index_of(id)
                .ok_or_else(|| EngineError::UnknownNode(id.clone()))
        })
        .transpose()?;

    tracing::debug!(
        algorithm = %config.algorithm,
        %source,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "starting traversal"
    );

    let recorder = Recorder::new(config.max_steps).with_entry_limit(config.max_frontier_entries);
    let mut walk = Run::new(graph, start, target, recorder);
    match config.algorithm {
        Algorithm::Bfs => walk.bfs(start)?,
        Algorithm::Dfs => walk.dfs(start)?,
        Algorithm::Dijkstra => walk.dijkstra(start)?,
    }

    let path = target.and_then(|t| walk.path_to(t));
    if let Some(path) = &path {
        let ids = walk.ids(path.iter().copied());
        walk.recorder.record(AlgorithmStep::PathReconstructed { ids })?;
    }

    let summary = TraversalSummary {
        algorithm: config.algorithm,
        source: source.clone(),
        target: config.target.clone(),
        visit_order: walk.ids(walk.visit_order.iter().copied()),
        distances: graph
            .nodes()
            .iter()
            .cloned()
            .zip(walk.distances.iter().zip(&walk.visited).map(|(&d, &visited)| {
                if visited {
                    Distance::from(d)
                } else {
                    Distance::Infinite
                }
            }))
            .collect(),
        parents: walk
            .parents
            .iter()
            .enumerate()
            .filter(|&(node, _)| walk.visited[node])
            .filter_map(|(node, parent)| parent.map(|p| (walk.id(node), walk.id(p))))
            .collect(),
        stopped_at_target: target.is_some_and(|t| walk.visited[t]),
        path: path.map(|p| walk.ids(p)),
    };

    tracing::info!(
        algorithm = %config.algorithm,
        visited = summary.visit_order.len(),
        steps = walk.recorder.len(),
        reached_target = summary.path.is_some(),
        "traversal finished"
    );
    Ok(walk.recorder.finish(summary))
}
