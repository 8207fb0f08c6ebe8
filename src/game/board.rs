//! Grid representation and the geometric helpers the merge engine is built on.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::config::GameConfig;
use super::rules::GameError;

/// Value of an occupied cell. Always a power of two.
pub type Tile = u32;
/// `None` is an empty cell.
pub type Cell = Option<Tile>;
/// A grid as it arrives from an untrusted caller: rows may be missing
/// (`null`) or have the wrong length.
pub type RawBoard = Vec<Option<Vec<Cell>>>;

/// Square grid of cells addressed by `(row, col)`, row 0 at the top and
/// column 0 on the left. Every row always holds exactly `size` cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Board {
    rows: Vec<Vec<Cell>>,
}

impl Board {
    pub fn empty(size: usize) -> Self {
        Self {
            rows: (0..size).map(|_| vec![None; size]).collect(),
        }
    }

    /// Strict constructor: the grid must be square and non-empty.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, GameError> {
        let size = rows.len();
        if size == 0 {
            return Err(GameError::MalformedBoard {
                reason: "board has no rows".into(),
            });
        }
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != size) {
            return Err(GameError::MalformedBoard {
                reason: format!("row {index} has {} cells, expected {size}", row.len()),
            });
        }
        Ok(Self { rows })
    }

    /// Lenient constructor: any missing or wrong-length row becomes an
    /// all-empty row, and the grid is cut or padded to `size` rows.
    pub fn normalized(raw: RawBoard, size: usize) -> Self {
        let mut raw = raw.into_iter();
        let rows = (0..size)
            .map(|_| match raw.next().flatten() {
                Some(row) if row.len() == size => row,
                _ => vec![None; size],
            })
            .collect();
        Self { rows }
    }

    /// Seeds an empty board with `initial_tiles` tiles, all of value 2.
    pub fn initial<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Self {
        let mut board = Self::empty(config.board_size);
        for _ in 0..config.initial_tiles {
            board = board.with_random_tile(1.0, rng);
        }
        board
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.rows.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Coordinates of every empty cell in row-major order.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .filter(|(_, cell)| cell.is_none())
                    .map(move |(col, _)| (row, col))
            })
            .collect()
    }

    pub fn has_empty_cells(&self) -> bool {
        self.rows.iter().flatten().any(Option::is_none)
    }

    /// Occupied cell values in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.rows.iter().flatten().filter_map(|cell| *cell)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    /// Copy of the board with one uniformly chosen empty cell set to 2
    /// (with probability `probability_of_two`) or 4. A full board is
    /// returned unchanged.
    pub fn with_random_tile<R: Rng + ?Sized>(&self, probability_of_two: f64, rng: &mut R) -> Self {
        let mut board = self.clone();
        let Some(&(row, col)) = self.empty_cells().choose(rng) else {
            return board;
        };
        let value = if rng.gen::<f64>() < probability_of_two { 2 } else { 4 };
        board.rows[row][col] = Some(value);
        board
    }

    /// Rows become columns.
    pub fn transpose(&self) -> Self {
        let size = self.size();
        let rows = (0..size)
            .map(|col| (0..size).map(|row| self.rows[row][col]).collect())
            .collect();
        Self { rows }
    }

    /// Mirrors every row left to right.
    pub fn reverse_rows(&self) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| row.iter().rev().copied().collect())
            .collect();
        Self { rows }
    }

    pub(crate) fn from_rows_unchecked(rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == rows.len()));
        Self { rows }
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Board {
    type Error = GameError;

    fn try_from(rows: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Board> for Vec<Vec<Cell>> {
    fn from(board: Board) -> Self {
        board.rows
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.rows.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "Row {index}: ")?;
            for (col, cell) in row.iter().enumerate() {
                if col > 0 {
                    f.write_str("|")?;
                }
                match cell {
                    Some(value) => write!(f, "{value:>4}")?,
                    None => f.write_str("    ")?,
                }
            }
        }
        Ok(())
    }
}

/// Empty coordinates of an untrusted grid. Missing or wrong-length rows are
/// skipped instead of being reported as empty.
pub fn raw_empty_cells(raw: &[Option<Vec<Cell>>], size: usize) -> Vec<(usize, usize)> {
    raw.iter()
        .take(size)
        .enumerate()
        .filter_map(|(row, cells)| match cells {
            Some(cells) if cells.len() == size => Some((row, cells)),
            _ => None,
        })
        .flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| cell.is_none())
                .map(move |(col, _)| (row, col))
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn board(rows: &[&[u32]]) -> Board {
    let rows = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|&value| if value == 0 { None } else { Some(value) })
                .collect()
        })
        .collect();
    Board::from_rows(rows).expect("test board should be square")
}
