//! Manhattan-distance heuristic for sliding-tile search.

use crate::puzzle::{Move, PuzzleState, BLANK};
use crate::solvability::goal_positions;

/// Goal-relative Manhattan distance, precomputed per goal board.
#[derive(Debug, Clone)]
pub struct Manhattan {
    size: usize,
    /// Goal cell index of every tile value
    goal_index: Vec<usize>,
}

impl Manhattan {
    pub fn new(goal: &PuzzleState) -> Self {
        Self {
            size: goal.size(),
            goal_index: goal_positions(goal),
        }
    }

    fn tile_distance(&self, tile: u8, index: usize) -> u32 {
        let goal = self.goal_index[tile as usize];
        let (r1, c1) = (index / self.size, index % self.size);
        let (r2, c2) = (goal / self.size, goal % self.size);
        (r1.abs_diff(r2) + c1.abs_diff(c2)) as u32
    }

    /// Sum of Manhattan distances of every non-blank tile.
    pub fn estimate(&self, state: &PuzzleState) -> u32 {
        state
            .cells()
            .iter()
            .enumerate()
            .filter(|(_, &tile)| tile != BLANK)
            .map(|(index, &tile)| self.tile_distance(tile, index))
            .sum()
    }

    /// Heuristic of `state.apply(mv)` given the heuristic of `state`.
    ///
    /// Only the slid tile changes position, so the estimate moves by at most
    /// one. Returns `None` when the move is illegal.
    pub fn after_move(&self, state: &PuzzleState, estimate: u32, mv: Move) -> Option<u32> {
        let tile = state.moved_tile(mv)?;
        let from = state.apply(mv)?.blank_index();
        let to = state.blank_index();
        Some(estimate + self.tile_distance(tile, to) - self.tile_distance(tile, from))
    }
}

/// One-off Manhattan distance between two boards.
pub fn manhattan_distance(state: &PuzzleState, goal: &PuzzleState) -> u32 {
    Manhattan::new(goal).estimate(state)
}
