use serde::{Deserialize, Serialize};

use super::rules::GameError;

pub const DEFAULT_BOARD_SIZE: usize = 4;
pub const MAX_BOARD_SIZE: usize = 16;
pub const DEFAULT_WIN_TILE: u32 = 2048;
pub const DEFAULT_INITIAL_TILES: usize = 2;
/// 90% chance of spawning a 2, 10% chance of a 4.
pub const DEFAULT_PROBABILITY_OF_TWO: f64 = 0.9;

pub const BEST_SCORE_KEY: &str = "game-2048-best-score";
pub const GAME_STATE_KEY: &str = "game-2048-state";

/// Tunable rules of a game. Every field falls back to its default when
/// missing from the incoming JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub board_size: usize,
    pub win_tile: u32,
    pub initial_tiles: usize,
    pub probability_of_two: f64,
}

impl GameConfig {
    pub fn with_board_size(mut self, board_size: usize) -> Self {
        self.board_size = board_size;
        self
    }

    pub fn with_win_tile(mut self, win_tile: u32) -> Self {
        self.win_tile = win_tile;
        self
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if !(2..=MAX_BOARD_SIZE).contains(&self.board_size) {
            return Err(GameError::InvalidConfig {
                reason: format!(
                    "board size must lie in [2, {MAX_BOARD_SIZE}], got {}",
                    self.board_size
                ),
            });
        }
        if self.win_tile < 4 || !self.win_tile.is_power_of_two() {
            return Err(GameError::InvalidConfig {
                reason: format!("win tile must be a power of two >= 4, got {}", self.win_tile),
            });
        }
        if !(0.0..=1.0).contains(&self.probability_of_two) {
            return Err(GameError::InvalidConfig {
                reason: format!(
                    "probability of two must lie in [0, 1], got {}",
                    self.probability_of_two
                ),
            });
        }
        let Some(cells) = self.board_size.checked_mul(self.board_size) else {
            return Err(GameError::InvalidConfig {
                reason: format!("board size {} is too large", self.board_size),
            });
        };
        if self.initial_tiles > cells {
            return Err(GameError::InvalidConfig {
                reason: format!(
                    "{} initial tiles do not fit on a board of {} cells",
                    self.initial_tiles, cells
                ),
            });
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            win_tile: DEFAULT_WIN_TILE,
            initial_tiles: DEFAULT_INITIAL_TILES,
            probability_of_two: DEFAULT_PROBABILITY_OF_TWO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"boardSize":5}"#).expect("config should parse");
        assert_eq!(config.board_size, 5);
        assert_eq!(config.win_tile, DEFAULT_WIN_TILE);
        assert_eq!(config.initial_tiles, DEFAULT_INITIAL_TILES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(GameConfig::default().with_board_size(1).validate().is_err());
        assert!(GameConfig::default().with_win_tile(1000).validate().is_err());
        assert!(GameConfig::default().with_win_tile(2).validate().is_err());

        let mut config = GameConfig::default();
        config.probability_of_two = 1.5;
        assert!(matches!(
            config.validate(),
            Err(GameError::InvalidConfig { .. })
        ));

        assert!(GameConfig::default()
            .with_board_size(MAX_BOARD_SIZE)
            .validate()
            .is_ok());
        assert!(GameConfig::default()
            .with_board_size(MAX_BOARD_SIZE + 1)
            .validate()
            .is_err());
        assert!(GameConfig::default()
            .with_board_size(usize::MAX / 2)
            .validate()
            .is_err());

        let mut crowded = GameConfig::default().with_board_size(2);
        crowded.initial_tiles = 5;
        assert!(crowded.validate().is_err());
    }

    #[test]
    fn huge_board_size_from_json_is_rejected() {
        let config: GameConfig = serde_json::from_str(r#"{"boardSize":100000,"initialTiles":3}"#)
            .expect("config should parse");
        assert!(matches!(
            config.validate(),
            Err(GameError::InvalidConfig { .. })
        ));
    }
}
