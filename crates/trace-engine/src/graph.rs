//! Weighted graph used by the traversal engine.
//!
//! Graphs deserialize from the JSON the Graph Theory Quest screen builds:
//!
//! ```json
//! { "directed": false,
//!   "nodes": ["A", "B", "C"],
//!   "edges": [{ "from": "A", "to": "B", "weight": 4 }] }
//! ```
//!
//! Undirected edges are stored as two opposite directed edges with
//! consecutive indices.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Stable node label, ordered lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

/// Position of a directed edge in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeIndex(pub usize);

/// A directed, non-negatively weighted edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: u64,
}

/// Serialized graph shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub directed: bool,
    pub nodes: Vec<NodeId>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GraphConfig", into = "GraphConfig")]
pub struct Graph {
    directed: bool,
    nodes: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    edges: Vec<Edge>,
    /// `(from, to)` node positions of every edge
    endpoints: Vec<(usize, usize)>,
    /// Outgoing edge indices per node, in insertion order
    adjacency: Vec<Vec<EdgeIndex>>,
}

impl Graph {
    pub fn directed() -> Self {
        Self::with_direction(true)
    }

    pub fn undirected() -> Self {
        Self::with_direction(false)
    }

    fn with_direction(directed: bool) -> Self {
        Self {
            directed,
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            endpoints: Vec::new(),
            adjacency: Vec::new(),
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Add a node; identifiers must be unique.
    pub fn add_node(&mut self, id: impl Into<NodeId>) -> Result<()> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(EngineError::invalid_graph(format!("duplicate node `{}`", id)));
        }
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(id);
        self.adjacency.push(Vec::new());
        Ok(())
    }

    /// Add an edge between existing nodes. In an undirected graph the
    /// reverse edge is added right after; the forward index is returned.
    pub fn add_edge(
        &mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        weight: u64,
    ) -> Result<EdgeIndex> {
        let from = from.into();
        let to = to.into();
        let a = self.require(&from)?;
        let b = self.require(&to)?;

        let forward = self.push_edge((a, b), from.clone(), to.clone(), weight);
        if !self.directed {
            self.push_edge((b, a), to, from, weight);
        }
        Ok(forward)
    }

    fn push_edge(
        &mut self,
        ends: (usize, usize),
        from: NodeId,
        to: NodeId,
        weight: u64,
    ) -> EdgeIndex {
        let index = EdgeIndex(self.edges.len());
        self.edges.push(Edge { from, to, weight });
        self.endpoints.push(ends);
        self.adjacency[ends.0].push(index);
        index
    }

    fn require(&self, id: &NodeId) -> Result<usize> {
        self.index_of(id)
            .ok_or_else(|| EngineError::UnknownNode(id.clone()))
    }

    pub(crate) fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Directed edge count (undirected edges count twice)
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge(&self, index: EdgeIndex) -> Option<&Edge> {
        self.edges.get(index.0)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub(crate) fn out_edges(&self, node: usize) -> &[EdgeIndex] {
        &self.adjacency[node]
    }

    /// Target position and weight of an edge
    pub(crate) fn head(&self, index: EdgeIndex) -> (usize, u64) {
        (self.endpoints[index.0].1, self.edges[index.0].weight)
    }

    /// Outgoing edges of `id` in insertion order.
    pub fn neighbors(&self, id: &NodeId) -> Result<impl Iterator<Item = (EdgeIndex, &Edge)> + '_> {
        let node = self.require(id)?;
        Ok(self.adjacency[node]
            .iter()
            .map(move |&index| (index, &self.edges[index.0])))
    }
}

impl TryFrom<GraphConfig> for Graph {
    type Error = EngineError;

    fn try_from(config: GraphConfig) -> Result<Self> {
        let mut graph = Graph::with_direction(config.directed);
        for node in config.nodes {
            graph.add_node(node)?;
        }
        for edge in config.edges {
            graph.add_edge(edge.from, edge.to, edge.weight)?;
        }
        Ok(graph)
    }
}

impl From<Graph> for GraphConfig {
    fn from(graph: Graph) -> Self {
        let step = if graph.directed { 1 } else { 2 };
        GraphConfig {
            directed: graph.directed,
            edges: graph.edges.into_iter().step_by(step).collect(),
            nodes: graph.nodes,
        }
    }
}
