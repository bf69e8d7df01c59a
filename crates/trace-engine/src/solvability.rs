//! Solvability check run before any search.
//!
//! Every move swaps the blank with a neighbour: one transposition of the
//! board permutation and one unit of blank displacement. A goal is therefore
//! reachable only when the permutation parity of `initial` relative to `goal`
//! matches the parity of the blank's Manhattan displacement. For the
//! canonical goal this is the classic inversion-count rule.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::puzzle::PuzzleState;

/// Parity facts behind a solvability verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParityReport {
    /// Whether the permutation taking `goal` to `initial` is odd
    pub permutation_odd: bool,
    /// Manhattan distance between the two blank positions
    pub blank_displacement: usize,
}

impl ParityReport {
    pub fn is_solvable(&self) -> bool {
        self.permutation_odd == (self.blank_displacement % 2 == 1)
    }
}

/// Reject board pairs that can never be compared.
pub fn check_compatible(initial: &PuzzleState, goal: &PuzzleState) -> Result<()> {
    if initial.size() != goal.size() {
        return Err(EngineError::invalid_puzzle(format!(
            "initial board is {}x{} but goal is {}x{}",
            initial.size(),
            initial.size(),
            goal.size(),
            goal.size()
        )));
    }
    let mut a = initial.cells().to_vec();
    let mut b = goal.cells().to_vec();
    a.sort_unstable();
    b.sort_unstable();
    if a != b {
        return Err(EngineError::invalid_puzzle(
            "initial and goal boards hold different tiles",
        ));
    }
    Ok(())
}

/// Goal index of every tile value
pub(crate) fn goal_positions(goal: &PuzzleState) -> Vec<usize> {
    let mut positions = vec![0; goal.cells().len()];
    for (index, &tile) in goal.cells().iter().enumerate() {
        positions[tile as usize] = index;
    }
    positions
}

/// Parity of the permutation mapping each cell of `initial` to the cell its
/// tile occupies in `goal`, via cycle decomposition.
fn permutation_is_odd(initial: &PuzzleState, goal_index: &[usize]) -> bool {
    let cells = initial.cells();
    let mut seen = vec![false; cells.len()];
    let mut cycles = 0;
    for start in 0..cells.len() {
        if seen[start] {
            continue;
        }
        cycles += 1;
        let mut at = start;
        while !seen[at] {
            seen[at] = true;
            at = goal_index[cells[at] as usize];
        }
    }
    (cells.len() - cycles) % 2 == 1
}

/// Compute the parity report for a pair of compatible boards.
pub fn parity_report(initial: &PuzzleState, goal: &PuzzleState) -> Result<ParityReport> {
    check_compatible(initial, goal)?;
    let goal_index = goal_positions(goal);
    let (r1, c1) = initial.blank_position();
    let (r2, c2) = goal.blank_position();
    Ok(ParityReport {
        permutation_odd: permutation_is_odd(initial, &goal_index),
        blank_displacement: r1.abs_diff(r2) + c1.abs_diff(c2),
    })
}

/// Whether `goal` is reachable from `initial`.
pub fn is_solvable(initial: &PuzzleState, goal: &PuzzleState) -> Result<bool> {
    parity_report(initial, goal).map(|report| report.is_solvable())
}
