//! Cursor-driven replay of recorded traces.
//!
//! A renderer owns a [`Playback`] over a finished trace and moves it forward,
//! backward or to an arbitrary position. The view at position `p` is the
//! initial view with `steps[0..p]` applied; moving backwards rebuilds it from
//! the initial view instead of undoing steps.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::graph::{EdgeIndex, NodeId};
use crate::puzzle::{Move, PuzzleState};
use crate::solver::{PuzzleSummary, PuzzleTrace, SearchId};
use crate::trace::{AlgorithmStep, Replay};
use crate::traversal::{Algorithm, Distance, GraphTrace, TraversalSummary};

/// Rebuild the view after the first `position` steps.
pub fn view_at<V: Replay>(
    initial: &V,
    steps: &[AlgorithmStep<V::Id, V::Edge>],
    position: usize,
) -> Result<V> {
    let mut view = initial.clone();
    for (index, step) in steps.iter().take(position).enumerate() {
        view.apply(index, step)?;
    }
    Ok(view)
}

/// A cursor over a trace's steps.
pub struct Playback<'t, V: Replay> {
    steps: &'t [AlgorithmStep<V::Id, V::Edge>],
    initial: V,
    view: V,
    position: usize,
}

impl<'t, V: Replay> Playback<'t, V> {
    pub fn new(initial: V, steps: &'t [AlgorithmStep<V::Id, V::Edge>]) -> Self {
        Self {
            steps,
            view: initial.clone(),
            initial,
            position: 0,
        }
    }

    /// Number of applied steps
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_at_end(&self) -> bool {
        self.position == self.steps.len()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// The most recently applied step
    pub fn current_step(&self) -> Option<&'t AlgorithmStep<V::Id, V::Edge>> {
        self.position.checked_sub(1).map(|i| &self.steps[i])
    }

    /// Apply the next step. Returns `false` at the end of the trace.
    pub fn forward(&mut self) -> Result<bool> {
        let Some(step) = self.steps.get(self.position) else {
            return Ok(false);
        };
        self.view.apply(self.position, step)?;
        self.position += 1;
        Ok(true)
    }

    /// Step back by one. Returns `false` at the start of the trace.
    pub fn back(&mut self) -> Result<bool> {
        if self.position == 0 {
            return Ok(false);
        }
        self.seek(self.position - 1)?;
        Ok(true)
    }

    /// Jump to `position`, clamped to the trace length.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        let position = position.min(self.steps.len());
        if position < self.position {
            self.view = view_at(&self.initial, self.steps, position)?;
            self.position = position;
        }
        while self.position < position {
            self.forward()?;
        }
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.view = self.initial.clone();
        self.position = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeRecord {
    parent: Option<SearchId>,
    via: Option<Move>,
    cost: u64,
}

/// Replay view of a sliding-tile search.
///
/// Tracks every search node seen so far and shows the board most recently
/// expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    initial: PuzzleState,
    goal: PuzzleState,
    #[serde(skip)]
    nodes: Vec<NodeRecord>,
    /// Board of the last expanded node
    current: PuzzleState,
    current_id: Option<SearchId>,
    expanded: usize,
    solution: Option<Vec<SearchId>>,
}

impl BoardView {
    pub fn new(initial: PuzzleState, goal: PuzzleState) -> Self {
        Self {
            current: initial.clone(),
            initial,
            goal,
            nodes: vec![NodeRecord {
                parent: None,
                via: None,
                cost: 0,
            }],
            current_id: None,
            expanded: 0,
            solution: None,
        }
    }

    pub fn current(&self) -> &PuzzleState {
        &self.current
    }

    pub fn current_id(&self) -> Option<SearchId> {
        self.current_id
    }

    pub fn expanded(&self) -> usize {
        self.expanded
    }

    pub fn generated(&self) -> usize {
        self.nodes.len()
    }

    pub fn cost_of(&self, id: SearchId) -> Option<u64> {
        self.nodes.get(id.0).map(|node| node.cost)
    }

    /// Moves from the initial board to node `id`
    fn moves_to(&self, id: SearchId) -> Option<Vec<Move>> {
        let mut moves = Vec::new();
        let mut at = self.nodes.get(id.0)?;
        while let Some(parent) = at.parent {
            moves.extend(at.via);
            at = self.nodes.get(parent.0)?;
        }
        moves.reverse();
        Some(moves)
    }

    /// Board of search node `id`, rebuilt from the initial board.
    pub fn board_of(&self, id: SearchId) -> Option<PuzzleState> {
        self.moves_to(id)?
            .into_iter()
            .try_fold(self.initial.clone(), |board, mv| board.apply(mv))
    }

    /// Solution moves, once the path has been replayed
    pub fn solution_moves(&self) -> Option<Vec<Move>> {
        let last = *self.solution.as_ref()?.last()?;
        self.moves_to(last)
    }

    fn known(&self, index: usize, id: SearchId) -> Result<&NodeRecord> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| EngineError::invalid_trace(index, format!("unknown search node {}", id.0)))
    }
}

impl Replay for BoardView {
    type Id = SearchId;
    type Edge = Move;
    type Summary = PuzzleSummary;

    fn apply(&mut self, index: usize, step: &AlgorithmStep<SearchId, Move>) -> Result<()> {
        match step {
            AlgorithmStep::NodeVisited { id } => {
                self.known(index, *id)?;
                self.current = self
                    .board_of(*id)
                    .ok_or_else(|| EngineError::invalid_trace(index, "unreachable board"))?;
                self.current_id = Some(*id);
                self.expanded += 1;
            }
            AlgorithmStep::EdgeRelaxed {
                from,
                to,
                new_distance,
                via,
            } => {
                let parent_cost = self.known(index, *from)?.cost;
                if to.0 != self.nodes.len() {
                    return Err(EngineError::invalid_trace(
                        index,
                        format!("expected new search node {}, got {}", self.nodes.len(), to.0),
                    ));
                }
                if *new_distance != parent_cost + 1 {
                    return Err(EngineError::invalid_trace(index, "cost does not follow parent"));
                }
                let legal = self
                    .board_of(*from)
                    .is_some_and(|board| board.is_legal(*via));
                if !legal {
                    return Err(EngineError::invalid_trace(
                        index,
                        format!("move {:?} is illegal from node {}", via, from.0),
                    ));
                }
                self.nodes.push(NodeRecord {
                    parent: Some(*from),
                    via: Some(*via),
                    cost: *new_distance,
                });
            }
            AlgorithmStep::FrontierUpdated { ids } => {
                for id in ids {
                    self.known(index, *id)?;
                }
            }
            AlgorithmStep::PathReconstructed { ids } => {
                for id in ids {
                    self.known(index, *id)?;
                }
                let chained = ids.first() == Some(&SearchId(0))
                    && ids
                        .windows(2)
                        .all(|pair| self.nodes[pair[1].0].parent == Some(pair[0]));
                if !chained {
                    return Err(EngineError::invalid_trace(index, "path is not a parent chain"));
                }
                self.solution = Some(ids.clone());
            }
        }
        Ok(())
    }

    fn summarize(&self) -> PuzzleSummary {
        PuzzleSummary {
            initial: self.initial.clone(),
            goal: self.goal.clone(),
            moves: self.solution_moves().unwrap_or_default(),
            nodes_expanded: self.expanded,
            nodes_generated: self.nodes.len(),
        }
    }
}

impl PuzzleTrace {
    /// Starting view for replaying this trace.
    pub fn initial_view(&self) -> BoardView {
        let summary = self.summary();
        BoardView::new(summary.initial.clone(), summary.goal.clone())
    }

    pub fn playback(&self) -> Playback<'_, BoardView> {
        Playback::new(self.initial_view(), self.steps())
    }
}

/// Display state of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeStatus {
    Unseen,
    /// Has a tentative distance but is not pending
    Discovered,
    Frontier,
    Visited,
}

/// Replay view of a graph traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphView {
    algorithm: Algorithm,
    source: NodeId,
    target: Option<NodeId>,
    distances: BTreeMap<NodeId, Distance>,
    parents: BTreeMap<NodeId, NodeId>,
    visited: BTreeSet<NodeId>,
    visit_order: Vec<NodeId>,
    frontier: Vec<NodeId>,
    last_edge: Option<EdgeIndex>,
    path: Option<Vec<NodeId>>,
}

impl GraphView {
    pub fn new(
        algorithm: Algorithm,
        nodes: impl IntoIterator<Item = NodeId>,
        source: NodeId,
        target: Option<NodeId>,
    ) -> Result<Self> {
        let mut distances: BTreeMap<NodeId, Distance> = nodes
            .into_iter()
            .map(|id| (id, Distance::Infinite))
            .collect();
        for id in std::iter::once(&source).chain(target.as_ref()) {
            if !distances.contains_key(id) {
                return Err(EngineError::UnknownNode(id.clone()));
            }
        }
        distances.insert(source.clone(), Distance::Finite(0));

        Ok(Self {
            algorithm,
            source,
            target,
            distances,
            parents: BTreeMap::new(),
            visited: BTreeSet::new(),
            visit_order: Vec::new(),
            frontier: Vec::new(),
            last_edge: None,
            path: None,
        })
    }

    pub fn status(&self, id: &NodeId) -> NodeStatus {
        if self.visited.contains(id) {
            NodeStatus::Visited
        } else if self.frontier.contains(id) {
            NodeStatus::Frontier
        } else if self.distance(id).is_finite() {
            NodeStatus::Discovered
        } else {
            NodeStatus::Unseen
        }
    }

    pub fn distance(&self, id: &NodeId) -> Distance {
        self.distances.get(id).copied().unwrap_or(Distance::Infinite)
    }

    pub fn frontier(&self) -> &[NodeId] {
        &self.frontier
    }

    pub fn visit_order(&self) -> &[NodeId] {
        &self.visit_order
    }

    /// Edge relaxed by the most recent `EdgeRelaxed` step
    pub fn last_edge(&self) -> Option<EdgeIndex> {
        self.last_edge
    }

    pub fn path(&self) -> Option<&[NodeId]> {
        self.path.as_deref()
    }

    fn known(&self, index: usize, id: &NodeId) -> Result<()> {
        if self.distances.contains_key(id) {
            Ok(())
        } else {
            Err(EngineError::invalid_trace(index, format!("unknown node `{}`", id)))
        }
    }
}

impl Replay for GraphView {
    type Id = NodeId;
    type Edge = EdgeIndex;
    type Summary = TraversalSummary;

    fn apply(&mut self, index: usize, step: &AlgorithmStep<NodeId, EdgeIndex>) -> Result<()> {
        match step {
            AlgorithmStep::NodeVisited { id } => {
                self.known(index, id)?;
                if !self.visited.insert(id.clone()) {
                    return Err(EngineError::invalid_trace(
                        index,
                        format!("node `{}` visited twice", id),
                    ));
                }
                self.frontier.retain(|pending| pending != id);
                self.visit_order.push(id.clone());
            }
            AlgorithmStep::EdgeRelaxed {
                from,
                to,
                new_distance,
                via,
            } => {
                self.known(index, from)?;
                self.known(index, to)?;
                self.distances.insert(to.clone(), Distance::Finite(*new_distance));
                self.parents.insert(to.clone(), from.clone());
                self.last_edge = Some(*via);
            }
            AlgorithmStep::FrontierUpdated { ids } => {
                for id in ids {
                    self.known(index, id)?;
                }
                self.frontier = ids.clone();
            }
            AlgorithmStep::PathReconstructed { ids } => {
                for id in ids {
                    self.known(index, id)?;
                }
                self.path = Some(ids.clone());
            }
        }
        Ok(())
    }

    fn summarize(&self) -> TraversalSummary {
        TraversalSummary {
            algorithm: self.algorithm,
            source: self.source.clone(),
            target: self.target.clone(),
            visit_order: self.visit_order.clone(),
            // Tentative values of unvisited nodes stay in the view only
            distances: self
                .distances
                .iter()
                .map(|(id, &distance)| {
                    let settled = self.visited.contains(id);
                    (id.clone(), if settled { distance } else { Distance::Infinite })
                })
                .collect(),
            parents: self
                .parents
                .iter()
                .filter(|(id, _)| self.visited.contains(*id))
                .map(|(id, parent)| (id.clone(), parent.clone()))
                .collect(),
            stopped_at_target: self
                .target
                .as_ref()
                .is_some_and(|target| self.visited.contains(target)),
            path: self.path.clone(),
        }
    }
}

impl GraphTrace {
    /// Starting view for replaying this trace.
    pub fn initial_view(&self) -> Result<GraphView> {
        let summary = self.summary();
        GraphView::new(
            summary.algorithm,
            summary.distances.keys().cloned(),
            summary.source.clone(),
            summary.target.clone(),
        )
    }

    pub fn playback(&self) -> Result<Playback<'_, GraphView>> {
        Ok(Playback::new(self.initial_view()?, self.steps()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::solver::{solve_to_canonical, SolverConfig};
    use crate::trace::Trace;
    use crate::traversal::{run, TraversalConfig};

    fn puzzle_trace() -> PuzzleTrace {
        let start = PuzzleState::from_cells(3, vec![1, 2, 3, 0, 4, 6, 7, 5, 8]).unwrap();
        solve_to_canonical(&start, &SolverConfig::default())
            .unwrap()
            .into_trace()
            .unwrap()
    }

    fn graph_trace(target: Option<&str>) -> GraphTrace {
        let mut graph = Graph::undirected();
        for id in ["A", "B", "C", "D", "Z"] {
            graph.add_node(id).unwrap();
        }
        graph.add_edge("A", "B", 2).unwrap();
        graph.add_edge("A", "C", 5).unwrap();
        graph.add_edge("B", "C", 1).unwrap();
        graph.add_edge("C", "D", 3).unwrap();
        let config = TraversalConfig {
            target: target.map(NodeId::from),
            ..Default::default()
        };
        run(&graph, &"A".into(), &config).unwrap()
    }

    #[test]
    fn test_puzzle_replay_matches_summary() {
        let trace = puzzle_trace();
        let mut playback = trace.playback();
        playback.seek(usize::MAX).unwrap();
        assert!(playback.is_at_end());
        assert_eq!(playback.view().summarize(), *trace.summary());
        assert_eq!(playback.view().current(), &trace.summary().goal);
    }

    #[test]
    fn test_puzzle_rebuilt_from_serialized_steps() {
        let trace = puzzle_trace();
        let json = serde_json::to_string(trace.steps()).unwrap();
        let steps = serde_json::from_str(&json).unwrap();
        let rebuilt = Trace::from_steps(trace.initial_view(), steps).unwrap();
        assert_eq!(rebuilt, trace);
    }

    #[test]
    fn test_graph_rebuilt_from_serialized_trace() {
        let trace = graph_trace(Some("D"));
        let json = serde_json::to_string(&trace).unwrap();
        let restored: GraphTrace = serde_json::from_str(&json).unwrap();
        let (steps, _) = restored.clone().into_parts();
        let rebuilt = Trace::from_steps(restored.initial_view().unwrap(), steps).unwrap();
        assert_eq!(rebuilt, trace);
        assert_eq!(
            rebuilt.summary().path,
            Some(vec!["A".into(), "B".into(), "C".into(), "D".into()])
        );
    }

    #[test]
    fn test_early_stop_summary_survives_rebuild() {
        let trace = graph_trace(Some("B"));
        let rebuilt =
            Trace::from_steps(trace.initial_view().unwrap(), trace.steps().to_vec()).unwrap();
        assert_eq!(rebuilt, trace);
        assert!(rebuilt.summary().stopped_at_target);
        assert_eq!(rebuilt.summary().distance(&"C".into()), Distance::Infinite);

        // The view still shows the tentative distance
        let mut playback = trace.playback().unwrap();
        playback.seek(trace.len()).unwrap();
        assert_eq!(playback.view().distance(&"C".into()), Distance::Finite(5));
        assert_eq!(playback.view().status(&"C".into()), NodeStatus::Frontier);
    }

    #[test]
    fn test_back_and_seek_match_fresh_replay() {
        let trace = graph_trace(None);
        let mut playback = trace.playback().unwrap();
        let initial = trace.initial_view().unwrap();

        while playback.forward().unwrap() {}
        for position in (0..trace.len()).rev() {
            assert!(playback.back().unwrap());
            let fresh = view_at(&initial, trace.steps(), position).unwrap();
            assert_eq!(playback.view(), &fresh, "position {}", position);
        }
        assert!(!playback.back().unwrap());

        playback.seek(4).unwrap();
        assert_eq!(playback.position(), 4);
        assert_eq!(playback.view(), &view_at(&initial, trace.steps(), 4).unwrap());
        assert_eq!(playback.current_step(), trace.get(3));
    }

    #[test]
    fn test_graph_view_statuses() {
        let trace = graph_trace(None);
        let mut playback = trace.playback().unwrap();
        let a = NodeId::from("A");
        let b = NodeId::from("B");
        let z = NodeId::from("Z");

        assert_eq!(playback.view().status(&a), NodeStatus::Discovered);
        playback.forward().unwrap(); // frontier [A]
        assert_eq!(playback.view().status(&a), NodeStatus::Frontier);
        playback.forward().unwrap(); // visit A
        assert_eq!(playback.view().status(&a), NodeStatus::Visited);
        playback.forward().unwrap(); // relax A-B
        assert_eq!(playback.view().distance(&b), Distance::Finite(2));
        assert_eq!(playback.view().last_edge(), Some(EdgeIndex(0)));

        playback.seek(trace.len()).unwrap();
        assert_eq!(playback.view().status(&z), NodeStatus::Unseen);
        assert_eq!(playback.view().distance(&z), Distance::Infinite);
    }

    #[test]
    fn test_rejects_malformed_puzzle_steps() {
        let trace = puzzle_trace();
        let mut steps = trace.steps().to_vec();
        steps.insert(
            1,
            AlgorithmStep::EdgeRelaxed {
                from: SearchId(0),
                to: SearchId(7),
                new_distance: 1,
                via: Move::Up,
            },
        );
        assert!(matches!(
            Trace::from_steps(trace.initial_view(), steps),
            Err(EngineError::InvalidTrace { index: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_double_visit() {
        let trace = graph_trace(None);
        let mut steps = trace.steps().to_vec();
        steps.push(AlgorithmStep::NodeVisited { id: "A".into() });
        let last = steps.len() - 1;
        let err = Trace::from_steps(trace.initial_view().unwrap(), steps).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidTrace {
                index: last,
                reason: "node `A` visited twice".to_string()
            }
        );
    }
}
