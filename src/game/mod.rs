//! Rules engine of the sliding-tile merge puzzle: board model, merge rules,
//! terminal-state checks and the turn state machine.

pub mod board;
pub mod config;
pub mod merge;
pub mod rules;
pub mod state;
pub mod store;

pub use board::{raw_empty_cells, Board, Cell, RawBoard, Tile};
pub use config::GameConfig;
pub use merge::{
    apply_merge, merge_down, merge_left, merge_right, merge_row, merge_up, Direction, MergeResult,
    RowMerge,
};
pub use rules::{
    can_make_move, has_available_moves, has_empty_cells, has_won, is_game_over, is_valid_move,
    raw_can_make_move, GameError,
};
pub use state::{GameState, HintSnapshot, MoveOutcome, SavedGame};
pub use store::GameStore;
