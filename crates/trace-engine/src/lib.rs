//! Step-trace engines for the CS training dashboard.
//!
//! This crate provides the algorithmic core behind the interactive modes:
//! an A* sliding-tile solver and BFS / DFS / Dijkstra graph traversals.
//! Each run returns a complete, immutable trace that a renderer replays with
//! a cursor, without calling back into the engine.

pub mod error;
pub mod graph;
pub mod heuristic;
pub mod mode;
pub mod playback;
pub mod puzzle;
pub mod solvability;
pub mod solver;
pub mod trace;
pub mod traversal;

// Re-export main types
pub use error::{EngineError, Resource, Result};
pub use graph::{Edge, EdgeIndex, Graph, GraphConfig, NodeId};
pub use heuristic::{manhattan_distance, Manhattan};
pub use mode::{EngineKind, GameMode};
pub use playback::{view_at, BoardView, GraphView, NodeStatus, Playback};
pub use puzzle::{Move, MoveList, PuzzleState};
pub use solvability::{is_solvable, parity_report, ParityReport};
pub use solver::{
    solve, solve_to_canonical, PuzzleStep, PuzzleSummary, PuzzleTrace, SearchId, SolveOutcome,
    SolverConfig,
};
pub use trace::{AlgorithmStep, Replay, Trace};
pub use traversal::{
    run, Algorithm, Distance, GraphStep, GraphTrace, TraversalConfig, TraversalSummary,
};
