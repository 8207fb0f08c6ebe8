use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board::Board;
use super::config::GameConfig;
use super::merge::{apply_merge, Direction};
use super::rules::{has_won, is_game_over, is_valid_move};

/// Everything the UI renders for one game. Values are never edited in
/// place: every accepted move, undo or new game produces a new state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub board: Board,
    pub score: u64,
    pub best_score: u64,
    pub game_over: bool,
    pub won: bool,
    pub can_undo: bool,
}

/// Result of an accepted move.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub state: GameState,
    /// Board after merging, before the new tile was spawned.
    pub merged_board: Board,
    pub score_gained: u64,
}

impl GameState {
    pub fn new<R: Rng + ?Sized>(config: &GameConfig, best_score: u64, rng: &mut R) -> Self {
        Self {
            board: Board::initial(config, rng),
            score: 0,
            best_score,
            game_over: false,
            won: false,
            can_undo: false,
        }
    }

    /// Plays one turn: merge, spawn, score, win and loss detection.
    ///
    /// Returns `None` when the game is already over or the move would not
    /// change the board; a rejected move does not consume a turn.
    pub fn apply_move<R: Rng + ?Sized>(
        &self,
        direction: Direction,
        config: &GameConfig,
        rng: &mut R,
    ) -> Option<MoveOutcome> {
        if self.game_over || !is_valid_move(&self.board, direction) {
            return None;
        }

        let merged = apply_merge(&self.board, direction);
        let board = merged
            .new_board
            .with_random_tile(config.probability_of_two, rng);
        let score = self.score + merged.score_gained;

        let state = GameState {
            won: self.won || has_won(&board, config.win_tile),
            game_over: is_game_over(&board),
            best_score: self.best_score.max(score),
            can_undo: true,
            score,
            board,
        };

        Some(MoveOutcome {
            state,
            merged_board: merged.new_board,
            score_gained: merged.score_gained,
        })
    }

    pub fn saved(&self) -> SavedGame {
        SavedGame {
            board: self.board.clone(),
            score: self.score,
            game_over: self.game_over,
            won: self.won,
            can_undo: self.can_undo,
        }
    }

    pub fn hint_snapshot(&self) -> HintSnapshot {
        HintSnapshot {
            board: self.board.clone(),
            score: self.score,
            best_score: self.best_score,
            game_over: self.game_over,
            won: self.won,
        }
    }
}

/// The part of a game that survives a page reload. The best score is kept
/// under its own key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedGame {
    pub board: Board,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub won: bool,
    #[serde(default)]
    pub can_undo: bool,
}

impl SavedGame {
    pub fn into_state(self, best_score: u64) -> GameState {
        GameState {
            board: self.board,
            score: self.score,
            best_score,
            game_over: self.game_over,
            won: self.won,
            can_undo: self.can_undo,
        }
    }
}

/// Read-only view handed to the hint layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HintSnapshot {
    pub board: Board,
    pub score: u64,
    pub best_score: u64,
    pub game_over: bool,
    pub won: bool,
}
