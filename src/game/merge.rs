//! Slide-and-merge rules. Only the leftward row merge is implemented
//! directly; the other directions are mirror images of it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::board::{Board, Cell};
use super::rules::GameError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "arrowleft" => Ok(Direction::Left),
            "right" | "arrowright" => Ok(Direction::Right),
            "up" | "arrowup" => Ok(Direction::Up),
            "down" | "arrowdown" => Ok(Direction::Down),
            _ => Err(GameError::InvalidDirection {
                value: s.to_string(),
            }),
        }
    }
}

/// Outcome of merging a single row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowMerge {
    pub new_row: Vec<Cell>,
    pub score_gained: u64,
}

/// Outcome of merging a whole board in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub new_board: Board,
    pub score_gained: u64,
}

/// Slides one row to the left and merges equal neighbours.
///
/// Empty cells are dropped first, then the remaining tiles are scanned once
/// from the left: an equal pair collapses into a single tile of twice the
/// value and both sources are consumed, so a freshly merged tile never
/// merges again in the same move. The result is right-padded with empty
/// cells. A row whose length is not `size` yields an all-empty row.
pub fn merge_row(row: &[Cell], size: usize) -> RowMerge {
    if row.len() != size {
        return RowMerge {
            new_row: vec![None; size],
            score_gained: 0,
        };
    }

    let tiles: Vec<u32> = row.iter().flatten().copied().collect();
    let mut new_row = Vec::with_capacity(size);
    let mut score_gained = 0u64;
    let mut i = 0;
    while i < tiles.len() {
        let current = tiles[i];
        // A pair whose sum does not fit in a tile stays unmerged.
        let merged = match tiles.get(i + 1) {
            Some(&next) if next == current => current.checked_mul(2),
            _ => None,
        };
        match merged {
            Some(merged) => {
                new_row.push(Some(merged));
                score_gained += u64::from(merged);
                i += 2;
            }
            None => {
                new_row.push(Some(current));
                i += 1;
            }
        }
    }
    new_row.resize(size, None);

    RowMerge {
        new_row,
        score_gained,
    }
}

pub fn merge_left(board: &Board) -> MergeResult {
    let size = board.size();
    let mut score_gained = 0;
    let rows = board
        .rows()
        .iter()
        .map(|row| {
            let merged = merge_row(row, size);
            score_gained += merged.score_gained;
            merged.new_row
        })
        .collect();

    MergeResult {
        new_board: Board::from_rows_unchecked(rows),
        score_gained,
    }
}

pub fn merge_right(board: &Board) -> MergeResult {
    let merged = merge_left(&board.reverse_rows());
    MergeResult {
        new_board: merged.new_board.reverse_rows(),
        score_gained: merged.score_gained,
    }
}

pub fn merge_up(board: &Board) -> MergeResult {
    let merged = merge_left(&board.transpose());
    MergeResult {
        new_board: merged.new_board.transpose(),
        score_gained: merged.score_gained,
    }
}

pub fn merge_down(board: &Board) -> MergeResult {
    let merged = merge_right(&board.transpose());
    MergeResult {
        new_board: merged.new_board.transpose(),
        score_gained: merged.score_gained,
    }
}

pub fn apply_merge(board: &Board, direction: Direction) -> MergeResult {
    match direction {
        Direction::Left => merge_left(board),
        Direction::Right => merge_right(board),
        Direction::Up => merge_up(board),
        Direction::Down => merge_down(board),
    }
}
