pub mod game;
pub mod storage;
pub mod utils;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

pub use game::{
    apply_merge, can_make_move, has_available_moves, has_empty_cells, has_won, is_game_over,
    is_valid_move, merge_row, raw_can_make_move, raw_empty_cells, Board, Cell, Direction, GameConfig, GameError, GameState, GameStore,
    HintSnapshot, MergeResult, MoveOutcome, RawBoard, RowMerge, SavedGame, Tile,
};
pub use storage::{BestScoreStore, GameStateStore, MemoryStorage, Storage, StorageError};

#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;

#[cfg(target_arch = "wasm32")]
type EngineStorage = storage::LocalStorage;
#[cfg(not(target_arch = "wasm32"))]
type EngineStorage = storage::MemoryStorage;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging(log::LevelFilter::Info);
}

/// Serializes with `null` for empty cells, matching what the UI stores.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn to_js_error(error: GameError) -> JsValue {
    to_js(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_direction(direction: &str) -> Result<Direction, JsValue> {
    direction.parse().map_err(to_js_error)
}

/// Untrusted input never fails: anything that is not a grid of the
/// default size is normalized into one.
fn raw_board_from_js(value: JsValue) -> RawBoard {
    from_value(value).unwrap_or_default()
}

fn board_from_js(value: JsValue) -> Board {
    Board::normalized(raw_board_from_js(value), GameConfig::default().board_size)
}

fn strict_from_js<T: DeserializeOwned>(value: JsValue) -> Option<T> {
    from_value(value).ok()
}

#[derive(Serialize)]
struct CellPosition {
    row: usize,
    col: usize,
}

#[wasm_bindgen]
pub struct GameEngine {
    store: GameStore<EngineStorage>,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<GameEngine, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => GameConfig::default(),
        };
        config.validate().map_err(to_js_error)?;
        Ok(GameEngine {
            store: GameStore::new(config, EngineStorage::default()),
        })
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(self.store.state())
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.store.state()).map_err(serde_to_js_error)
    }

    pub fn config(&self) -> Result<JsValue, JsValue> {
        to_js(self.store.config())
    }

    /// Returns whether the move was accepted.
    #[wasm_bindgen(js_name = "move")]
    pub fn move_tiles(&mut self, direction: &str) -> Result<bool, JsValue> {
        let direction = parse_direction(direction)?;
        Ok(self.store.move_tiles(direction))
    }

    #[wasm_bindgen(js_name = "newGame")]
    pub fn new_game(&mut self) {
        self.store.new_game();
    }

    pub fn undo(&mut self) -> bool {
        self.store.undo()
    }

    #[wasm_bindgen(getter)]
    pub fn score(&self) -> f64 {
        self.store.state().score as f64
    }

    #[wasm_bindgen(getter, js_name = "bestScore")]
    pub fn best_score(&self) -> f64 {
        self.store.state().best_score as f64
    }

    #[wasm_bindgen(getter, js_name = "canUndo")]
    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    #[wasm_bindgen(getter, js_name = "gameOver")]
    pub fn game_over(&self) -> bool {
        self.store.state().game_over
    }

    #[wasm_bindgen(getter)]
    pub fn won(&self) -> bool {
        self.store.state().won
    }

    #[wasm_bindgen(getter)]
    pub fn board(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.state().board)
    }

    #[wasm_bindgen(js_name = "hintSnapshot")]
    pub fn hint_snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.hint_snapshot())
    }

    #[wasm_bindgen(js_name = "applySuggestion")]
    pub fn apply_suggestion(&mut self, direction: &str) -> Result<bool, JsValue> {
        let direction = parse_direction(direction)?;
        Ok(self.store.apply_suggestion(direction))
    }
}

#[wasm_bindgen(js_name = "createEmptyBoard")]
pub fn create_empty_board() -> Result<JsValue, JsValue> {
    to_js(&Board::empty(GameConfig::default().board_size))
}

#[wasm_bindgen(js_name = "createInitialBoard")]
pub fn create_initial_board() -> Result<JsValue, JsValue> {
    let mut rng = rand::thread_rng();
    to_js(&Board::initial(&GameConfig::default(), &mut rng))
}

#[wasm_bindgen(js_name = "emptyCells")]
pub fn empty_cells(board: JsValue) -> Result<JsValue, JsValue> {
    let raw = raw_board_from_js(board);
    let cells: Vec<CellPosition> = raw_empty_cells(&raw, GameConfig::default().board_size)
        .into_iter()
        .map(|(row, col)| CellPosition { row, col })
        .collect();
    to_js(&cells)
}

#[wasm_bindgen(js_name = "addRandomTile")]
pub fn add_random_tile(board: JsValue, probability_of_two: Option<f64>) -> Result<JsValue, JsValue> {
    let probability = probability_of_two.unwrap_or(GameConfig::default().probability_of_two);
    let mut rng = rand::thread_rng();
    to_js(&board_from_js(board).with_random_tile(probability, &mut rng))
}

/// Strict comparison: malformed or mismatched grids are never equal.
#[wasm_bindgen(js_name = "boardsEqual")]
pub fn boards_equal(a: JsValue, b: JsValue) -> bool {
    match (strict_from_js::<Board>(a), strict_from_js::<Board>(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[wasm_bindgen(js_name = "transposeBoard")]
pub fn transpose_board(board: JsValue) -> Result<JsValue, JsValue> {
    to_js(&board_from_js(board).transpose())
}

#[wasm_bindgen(js_name = "reverseBoard")]
pub fn reverse_board(board: JsValue) -> Result<JsValue, JsValue> {
    to_js(&board_from_js(board).reverse_rows())
}

#[wasm_bindgen(js_name = "processRow")]
pub fn process_row(row: JsValue) -> Result<JsValue, JsValue> {
    let row: Vec<Cell> = strict_from_js(row).unwrap_or_default();
    to_js(&merge_row(&row, GameConfig::default().board_size))
}

#[wasm_bindgen(js_name = "applyMerge")]
pub fn apply_merge_js(board: JsValue, direction: &str) -> Result<JsValue, JsValue> {
    let direction = parse_direction(direction)?;
    to_js(&apply_merge(&board_from_js(board), direction))
}

#[wasm_bindgen(js_name = "isValidMove")]
pub fn is_valid_move_js(board: JsValue, direction: &str) -> Result<bool, JsValue> {
    let direction = parse_direction(direction)?;
    Ok(is_valid_move(&board_from_js(board), direction))
}

#[wasm_bindgen(js_name = "hasEmptyCells")]
pub fn has_empty_cells_js(board: JsValue) -> bool {
    !raw_empty_cells(&raw_board_from_js(board), GameConfig::default().board_size).is_empty()
}

#[wasm_bindgen(js_name = "hasWon")]
pub fn has_won_js(board: JsValue, win_tile: Option<u32>) -> bool {
    let win_tile = win_tile.unwrap_or(GameConfig::default().win_tile);
    has_won(&board_from_js(board), win_tile)
}

#[wasm_bindgen(js_name = "canMakeMove")]
pub fn can_make_move_js(board: JsValue) -> bool {
    raw_can_make_move(&raw_board_from_js(board), GameConfig::default().board_size)
}

#[wasm_bindgen(js_name = "isGameOver")]
pub fn is_game_over_js(board: JsValue) -> bool {
    !can_make_move_js(board)
}

#[wasm_bindgen(js_name = "hasAvailableMoves")]
pub fn has_available_moves_js(board: JsValue) -> bool {
    has_available_moves(&board_from_js(board))
}

/// Pure turn transition without persistence. A rejected move hands the
/// input state back unchanged.
#[wasm_bindgen(js_name = "makeMove")]
pub fn make_move(state: JsValue, direction: &str) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let direction = parse_direction(direction)?;
    let config = GameConfig {
        board_size: state.board.size(),
        ..GameConfig::default()
    };
    let mut rng = rand::thread_rng();
    match state.apply_move(direction, &config, &mut rng) {
        Some(outcome) => to_js(&outcome.state),
        None => to_js(&state),
    }
}
