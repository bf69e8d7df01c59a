//! Sliding-tile board representation.
//!
//! Boards deserialize from the same row-major JSON the dashboard sends
//! (`[[1,2,3],[4,5,6],[7,8,0]]`) and are validated on the way in, so every
//! `PuzzleState` in the crate upholds the board invariants.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{EngineError, Result};

/// Largest supported board side; every cell value must fit in a `u8`.
pub const MAX_SIZE: usize = 15;

/// Value marking the blank cell
pub const BLANK: u8 = 0;

/// A slide into the blank. `Up` moves the tile above the blank down, so the
/// blank itself travels up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// Exploration order used by every search in the crate
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    pub fn opposite(self) -> Move {
        match self {
            Move::Up => Move::Down,
            Move::Down => Move::Up,
            Move::Left => Move::Right,
            Move::Right => Move::Left,
        }
    }

    /// Displacement of the blank as `(dx, dy)`
    pub fn delta(self) -> (i32, i32) {
        match self {
            Move::Up => (0, -1),
            Move::Down => (0, 1),
            Move::Left => (-1, 0),
            Move::Right => (1, 0),
        }
    }
}

/// Legal moves from one state; never more than four.
pub type MoveList = SmallVec<[Move; 4]>;

/// An immutable square board holding `0..N²` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct PuzzleState {
    size: u8,
    blank: u8,
    cells: Box<[u8]>,
}

impl PuzzleState {
    /// Build a board from row-major cells, validating shape and contents.
    pub fn from_cells(size: usize, cells: Vec<u8>) -> Result<Self> {
        if size == 0 || size > MAX_SIZE {
            return Err(EngineError::invalid_puzzle(format!(
                "board size {} outside 1..={}",
                size, MAX_SIZE
            )));
        }
        let len = size * size;
        if cells.len() != len {
            return Err(EngineError::invalid_puzzle(format!(
                "expected {} cells for a {}x{} board, got {}",
                len,
                size,
                size,
                cells.len()
            )));
        }

        let mut seen = vec![false; len];
        for &value in &cells {
            let slot = seen.get_mut(value as usize).ok_or_else(|| {
                EngineError::invalid_puzzle(format!("tile {} out of range 0..{}", value, len))
            })?;
            if *slot {
                return Err(EngineError::invalid_puzzle(format!("tile {} appears twice", value)));
            }
            *slot = true;
        }

        // Range and uniqueness together guarantee exactly one blank.
        let blank = cells
            .iter()
            .position(|&v| v == BLANK)
            .ok_or_else(|| EngineError::invalid_puzzle("board has no blank"))?;

        Ok(Self {
            size: size as u8,
            blank: blank as u8,
            cells: cells.into_boxed_slice(),
        })
    }

    /// Build a board from a list of rows.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self> {
        let size = rows.len();
        if let Some(bad) = rows.iter().position(|row| row.len() != size) {
            return Err(EngineError::invalid_puzzle(format!(
                "row {} has {} cells, board is not square ({} rows)",
                bad,
                rows[bad].len(),
                size
            )));
        }
        Self::from_cells(size, rows.into_iter().flatten().collect())
    }

    /// The canonical goal: `1, 2, ..., N²-1` followed by the blank.
    pub fn solved(size: usize) -> Result<Self> {
        let len = size * size;
        let cells = (1..len).chain(std::iter::once(0)).map(|v| v as u8).collect();
        Self::from_cells(size, cells)
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn blank_index(&self) -> usize {
        self.blank as usize
    }

    /// Blank location as `(row, col)`
    pub fn blank_position(&self) -> (usize, usize) {
        self.position_of(self.blank_index())
    }

    /// Zero-based row of the blank, counted from the top
    pub fn blank_row(&self) -> usize {
        self.blank_position().0
    }

    /// Convert a cell index into `(row, col)`
    pub fn position_of(&self, index: usize) -> (usize, usize) {
        (index / self.size(), index % self.size())
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.size() || col >= self.size() {
            return None;
        }
        Some(self.cells[row * self.size() + col])
    }

    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.cells.chunks(self.size()).map(<[u8]>::to_vec).collect()
    }

    /// Cell the blank would swap with, if the move is legal.
    fn swap_target(&self, mv: Move) -> Option<usize> {
        let (row, col) = self.blank_position();
        let last = self.size() - 1;
        let blank = self.blank_index();
        match mv {
            Move::Up if row > 0 => Some(blank - self.size()),
            Move::Down if row < last => Some(blank + self.size()),
            Move::Left if col > 0 => Some(blank - 1),
            Move::Right if col < last => Some(blank + 1),
            _ => None,
        }
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.swap_target(mv).is_some()
    }

    /// Legal moves in `Move::ALL` order
    pub fn legal_moves(&self) -> MoveList {
        Move::ALL.into_iter().filter(|&mv| self.is_legal(mv)).collect()
    }

    /// The tile that slides when `mv` is played
    pub fn moved_tile(&self, mv: Move) -> Option<u8> {
        self.swap_target(mv).map(|target| self.cells[target])
    }

    /// Play a move, returning the successor state or `None` if illegal.
    pub fn apply(&self, mv: Move) -> Option<PuzzleState> {
        let target = self.swap_target(mv)?;
        let mut cells = self.cells.clone();
        cells.swap(self.blank_index(), target);
        Some(Self {
            size: self.size,
            blank: target as u8,
            cells,
        })
    }

    /// Play a sequence of moves, failing on the first illegal one.
    pub fn apply_all(&self, moves: &[Move]) -> Result<PuzzleState> {
        let mut state = self.clone();
        for (i, &mv) in moves.iter().enumerate() {
            state = state.apply(mv).ok_or_else(|| {
                EngineError::invalid_puzzle(format!("move {} ({:?}) is illegal", i, mv))
            })?;
        }
        Ok(state)
    }

    /// Pairs of non-blank tiles that appear in decreasing order when the
    /// board is read row by row.
    pub fn inversion_count(&self) -> usize {
        let tiles: Vec<u8> = self.cells.iter().copied().filter(|&v| v != BLANK).collect();
        let mut count = 0;
        for i in 0..tiles.len() {
            for j in (i + 1)..tiles.len() {
                if tiles[i] > tiles[j] {
                    count += 1;
                }
            }
        }
        count
    }
}

impl TryFrom<Vec<Vec<u8>>> for PuzzleState {
    type Error = EngineError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl From<PuzzleState> for Vec<Vec<u8>> {
    fn from(state: PuzzleState) -> Self {
        state.rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(cells: &[u8]) -> PuzzleState {
        let size = (cells.len() as f64).sqrt() as usize;
        PuzzleState::from_cells(size, cells.to_vec()).unwrap()
    }

    #[test]
    fn test_solved_board() {
        let goal = PuzzleState::solved(3).unwrap();
        assert_eq!(goal.cells(), &[1, 2, 3, 4, 5, 6, 7, 8, 0]);
        assert_eq!(goal.blank_position(), (2, 2));
        assert_eq!(goal.inversion_count(), 0);
    }

    #[test]
    fn test_rejects_malformed_boards() {
        assert!(PuzzleState::from_cells(0, vec![]).is_err());
        assert!(PuzzleState::from_cells(2, vec![0, 1, 2]).is_err());
        assert!(PuzzleState::from_cells(2, vec![0, 1, 1, 2]).is_err());
        assert!(PuzzleState::from_cells(2, vec![0, 1, 2, 4]).is_err());
        assert!(PuzzleState::from_rows(vec![vec![1, 2], vec![3]]).is_err());
        assert!(PuzzleState::from_cells(16, vec![0; 256]).is_err());
    }

    #[test]
    fn test_legal_moves_follow_blank_edges() {
        // Blank in the top-left corner
        let corner = board(&[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(corner.legal_moves().as_slice(), &[Move::Down, Move::Right]);

        // Blank in the middle
        let centre = board(&[1, 2, 3, 4, 0, 5, 6, 7, 8]);
        assert_eq!(centre.legal_moves().as_slice(), &Move::ALL);
    }

    #[test]
    fn test_apply_slides_adjacent_tile() {
        let state = board(&[1, 2, 3, 4, 0, 6, 7, 5, 8]);
        assert_eq!(state.moved_tile(Move::Down), Some(5));

        let next = state.apply(Move::Down).unwrap();
        assert_eq!(next.cells(), &[1, 2, 3, 4, 5, 6, 7, 0, 8]);
        assert_eq!(next.blank_index(), 7);

        let back = next.apply(Move::Down.opposite()).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_apply_all_rejects_illegal_move() {
        let goal = PuzzleState::solved(3).unwrap();
        assert!(goal.apply(Move::Right).is_none());
        assert!(goal.apply_all(&[Move::Up, Move::Right, Move::Right]).is_err());
        assert!(goal.apply_all(&[Move::Up, Move::Left]).is_ok());
    }

    #[test]
    fn test_json_rows() {
        let state: PuzzleState = serde_json::from_str("[[1,2],[0,3]]").unwrap();
        assert_eq!(state.blank_position(), (1, 0));
        assert_eq!(serde_json::to_string(&state).unwrap(), "[[1,2],[0,3]]");

        assert!(serde_json::from_str::<PuzzleState>("[[1,2],[2,0]]").is_err());
    }

    #[test]
    fn test_inversion_count() {
        assert_eq!(board(&[1, 2, 3, 4, 5, 6, 8, 7, 0]).inversion_count(), 1);
        assert_eq!(board(&[8, 7, 6, 5, 4, 3, 2, 1, 0]).inversion_count(), 28);
        // Blank is ignored wherever it sits
        assert_eq!(board(&[2, 0, 1, 3]).inversion_count(), 1);
    }
}
