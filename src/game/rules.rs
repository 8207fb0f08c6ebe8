use std::fmt;

use serde::{Deserialize, Serialize};

use super::board::{Board, Cell, Tile};
use super::merge::{apply_merge, Direction};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameError {
    InvalidDirection { value: String },
    InvalidConfig { reason: String },
    MalformedBoard { reason: String },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::InvalidDirection { value } => write!(f, "invalid direction: {value}"),
            GameError::InvalidConfig { reason } => write!(f, "invalid config: {reason}"),
            GameError::MalformedBoard { reason } => write!(f, "malformed board: {reason}"),
        }
    }
}

impl std::error::Error for GameError {}

/// A move is legal iff it changes at least one cell.
pub fn is_valid_move(board: &Board, direction: Direction) -> bool {
    apply_merge(board, direction).new_board != *board
}

pub fn has_empty_cells(board: &Board) -> bool {
    board.has_empty_cells()
}

pub fn has_won(board: &Board, win_tile: Tile) -> bool {
    board.tiles().any(|tile| tile == win_tile)
}

/// Fast check: an empty cell, or any tile equal to its right or lower
/// neighbour, means some move is still possible.
pub fn can_make_move(board: &Board) -> bool {
    let rows: Vec<Option<&[Cell]>> = board.rows().iter().map(|row| Some(row.as_slice())).collect();
    grid_can_move(&rows)
}

/// [`can_make_move`] over an untrusted grid. Missing or wrong-length rows
/// are skipped: they hold no empty cell and no neighbour to merge with.
pub fn raw_can_make_move(raw: &[Option<Vec<Cell>>], size: usize) -> bool {
    let rows: Vec<Option<&[Cell]>> = (0..size)
        .map(|index| match raw.get(index) {
            Some(Some(row)) if row.len() == size => Some(row.as_slice()),
            _ => None,
        })
        .collect();
    grid_can_move(&rows)
}

fn grid_can_move(rows: &[Option<&[Cell]>]) -> bool {
    if rows.iter().flatten().any(|row| row.iter().any(Option::is_none)) {
        return true;
    }

    rows.iter().enumerate().any(|(r, row)| {
        let Some(row) = row else {
            return false;
        };
        row.iter().enumerate().any(|(c, cell)| {
            let Some(value) = cell else {
                return false;
            };
            let right = row.get(c + 1).copied().flatten();
            let below = rows
                .get(r + 1)
                .copied()
                .flatten()
                .and_then(|next| next.get(c))
                .copied()
                .flatten();
            right == Some(*value) || below == Some(*value)
        })
    })
}

pub fn is_game_over(board: &Board) -> bool {
    !can_make_move(board)
}

/// Slow check: simulates all four directions.
pub fn has_available_moves(board: &Board) -> bool {
    Direction::ALL
        .iter()
        .any(|&direction| is_valid_move(board, direction))
}
