//! Session container: the current game, one level of undo, and the
//! best-effort persistence side effects of every transition.

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::config::GameConfig;
use super::merge::Direction;
use super::state::{GameState, HintSnapshot};
use crate::storage::Storage;

pub struct GameStore<S: Storage> {
    config: GameConfig,
    state: GameState,
    previous: Option<GameState>,
    storage: S,
    rng: SmallRng,
}

impl<S: Storage> GameStore<S> {
    pub fn new(config: GameConfig, storage: S) -> Self {
        Self::with_rng(config, storage, SmallRng::from_entropy())
    }

    pub fn with_seed(config: GameConfig, storage: S, seed: u64) -> Self {
        Self::with_rng(config, storage, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, storage: S, mut rng: SmallRng) -> Self {
        let best_score = read_best_score(&storage);
        let state = match restore_saved_game(&storage, &config, best_score) {
            Some(state) => {
                info!("[GameStore] Restored saved game with score {}", state.score);
                state
            }
            None => GameState::new(&config, best_score, &mut rng),
        };

        Self {
            config,
            state,
            previous: None,
            storage,
            rng,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn can_undo(&self) -> bool {
        self.state.can_undo
    }

    /// Plays a move. Returns `false`, leaving everything untouched, when the
    /// game is over or the move would not change the board.
    pub fn move_tiles(&mut self, direction: Direction) -> bool {
        let Some(outcome) = self
            .state
            .apply_move(direction, &self.config, &mut self.rng)
        else {
            return false;
        };

        let next = outcome.state;
        if next.best_score > self.state.best_score {
            if let Err(error) = self.storage.write_best_score(next.best_score) {
                warn!("[GameStore] Failed to save best score: {error}");
            }
        }
        debug!(
            "[GameStore] {direction} gained {} points, score {}\n{}",
            outcome.score_gained, next.score, next.board
        );

        self.previous = Some(std::mem::replace(&mut self.state, next));
        self.persist();
        true
    }

    pub fn new_game(&mut self) {
        let best_score = read_best_score(&self.storage);
        self.state = GameState::new(&self.config, best_score, &mut self.rng);
        self.previous = None;
        info!("[GameStore] New game started, best score {best_score}");

        if let Err(error) = self.storage.clear_game_state() {
            warn!("[GameStore] Failed to clear saved game: {error}");
        }
        self.persist();
    }

    /// Restores the state from before the last accepted move. Only one level
    /// is kept, so a second consecutive undo does nothing.
    pub fn undo(&mut self) -> bool {
        let Some(mut previous) = self.previous.take() else {
            return false;
        };
        previous.can_undo = false;
        self.state = previous;
        self.persist();
        true
    }

    pub fn hint_snapshot(&self) -> HintSnapshot {
        self.state.hint_snapshot()
    }

    /// Suggestions from the hint layer go through the same validation as
    /// player input.
    pub fn apply_suggestion(&mut self, direction: Direction) -> bool {
        self.move_tiles(direction)
    }

    fn persist(&self) {
        if let Err(error) = self.storage.write_game_state(&self.state.saved()) {
            warn!("[GameStore] Failed to save game state: {error}");
        }
    }
}

fn read_best_score<S: Storage>(storage: &S) -> u64 {
    match storage.read_best_score() {
        Ok(score) => score.unwrap_or(0),
        Err(error) => {
            warn!("[GameStore] Failed to load best score: {error}");
            0
        }
    }
}

fn restore_saved_game<S: Storage>(
    storage: &S,
    config: &GameConfig,
    best_score: u64,
) -> Option<GameState> {
    let saved = match storage.read_game_state() {
        Ok(saved) => saved?,
        Err(error) => {
            warn!("[GameStore] Failed to load saved game: {error}");
            return None;
        }
    };
    if saved.board.size() != config.board_size {
        warn!(
            "[GameStore] Ignoring saved {n}x{n} board, expected {m}x{m}",
            n = saved.board.size(),
            m = config.board_size
        );
        return None;
    }
    // The undo slot is not persisted, so a restored game starts without one.
    let mut state = saved.into_state(best_score);
    state.can_undo = false;
    Some(state)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::game::board::board;
    use crate::game::config::{BEST_SCORE_KEY, GAME_STATE_KEY};
    use crate::game::{Board, SavedGame};
    use crate::storage::{GameStateStore, MemoryStorage};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn store_with(board: Board) -> (GameStore<Rc<MemoryStorage>>, Rc<MemoryStorage>) {
        init_logging();
        let storage = Rc::new(MemoryStorage::new());
        storage
            .write_game_state(&SavedGame {
                board,
                score: 0,
                game_over: false,
                won: false,
                can_undo: false,
            })
            .expect("seeding storage should succeed");
        let store = GameStore::with_seed(GameConfig::default(), Rc::clone(&storage), 17);
        (store, storage)
    }

    fn open_board() -> Board {
        board(&[&[2, 2, 0, 0], &[0, 4, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 8]])
    }

    #[test]
    fn fresh_store_starts_with_two_tiles() {
        init_logging();
        let storage = Rc::new(MemoryStorage::new());
        storage.insert_raw(BEST_SCORE_KEY, "300");
        let store = GameStore::with_seed(GameConfig::default(), Rc::clone(&storage), 1);
        let state = store.state();
        assert_eq!(state.board.tiles().collect::<Vec<_>>(), vec![2, 2]);
        assert_eq!(state.score, 0);
        assert_eq!(state.best_score, 300);
        assert!(!state.can_undo && !state.won && !state.game_over);
    }

    #[test]
    fn saved_game_is_restored() {
        let (store, _) = store_with(open_board());
        assert_eq!(store.state().board, open_board());
    }

    #[test]
    fn restored_game_has_nothing_to_undo() {
        init_logging();
        let storage = Rc::new(MemoryStorage::new());
        storage
            .write_game_state(&SavedGame {
                board: open_board(),
                score: 12,
                game_over: false,
                won: false,
                can_undo: true,
            })
            .expect("seeding storage should succeed");

        let mut store = GameStore::with_seed(GameConfig::default(), Rc::clone(&storage), 17);
        assert_eq!(store.state().score, 12);
        assert!(!store.can_undo());
        assert!(!store.state().can_undo);
        assert!(!store.undo());
        assert_eq!(store.state().board, open_board());
    }

    #[test]
    fn saved_board_of_wrong_size_is_ignored() {
        let (store, _) = store_with(board(&[&[2, 0], &[0, 2]]));
        assert_eq!(store.state().board.size(), 4);
        assert_eq!(store.state().board.tile_count(), 2);
    }

    #[test]
    fn rejected_move_is_a_no_op() {
        let locked_left = board(&[&[2, 0, 0, 0], &[4, 0, 0, 0], &[8, 0, 0, 0], &[16, 0, 0, 0]]);
        let (mut store, storage) = store_with(locked_left.clone());
        let stored_before = storage.raw(GAME_STATE_KEY);

        assert!(!store.move_tiles(Direction::Left));
        assert_eq!(store.state().board, locked_left);
        assert_eq!(store.state().score, 0);
        assert!(!store.can_undo());
        assert_eq!(storage.raw(GAME_STATE_KEY), stored_before);
    }

    #[test]
    fn accepted_move_updates_and_persists() {
        let (mut store, storage) = store_with(open_board());
        assert!(store.move_tiles(Direction::Left));

        let state = store.state();
        assert_eq!(state.score, 4);
        assert_eq!(state.best_score, 4);
        assert!(state.can_undo);
        assert_eq!(state.board.tile_count(), 4);
        assert_eq!(storage.raw(BEST_SCORE_KEY).as_deref(), Some("4"));

        let saved = storage
            .read_game_state()
            .expect("read should succeed")
            .expect("game should be saved");
        assert_eq!(saved.board, state.board);
        assert_eq!(saved.score, 4);
        assert!(saved.can_undo);
    }

    #[test]
    fn best_score_is_only_written_when_beaten() {
        let (mut store, storage) = store_with(open_board());
        storage.insert_raw(BEST_SCORE_KEY, "1000");
        store.new_game();
        assert_eq!(store.state().best_score, 1000);

        let mut moved = false;
        for direction in Direction::ALL {
            moved |= store.move_tiles(direction);
        }
        assert!(moved);
        assert_eq!(storage.raw(BEST_SCORE_KEY).as_deref(), Some("1000"));
        assert_eq!(store.state().best_score, 1000);
    }

    #[test]
    fn undo_restores_exactly_one_move() {
        let (mut store, _) = store_with(open_board());
        let before = store.state().clone();

        assert!(store.move_tiles(Direction::Left));
        assert!(store.undo());
        assert_eq!(store.state().board, before.board);
        assert_eq!(store.state().score, before.score);
        assert!(!store.can_undo());

        let after_first_undo = store.state().clone();
        assert!(!store.undo(), "second undo is a no-op");
        assert_eq!(store.state(), &after_first_undo);
    }

    #[test]
    fn undo_after_two_moves_goes_back_one() {
        let (mut store, _) = store_with(open_board());
        assert!(store.move_tiles(Direction::Left));
        let after_first = store.state().clone();
        let mut moved = false;
        for direction in [Direction::Right, Direction::Down, Direction::Up] {
            if store.move_tiles(direction) {
                moved = true;
                break;
            }
        }
        assert!(moved);
        assert!(store.undo());
        assert_eq!(store.state().board, after_first.board);
        assert_eq!(store.state().score, after_first.score);
        assert!(!store.state().can_undo);
    }

    #[test]
    fn new_game_resets_and_clears_history() {
        let (mut store, storage) = store_with(open_board());
        assert!(store.move_tiles(Direction::Left));
        store.new_game();

        let state = store.state().clone();
        assert_eq!(state.score, 0);
        assert_eq!(state.best_score, 4, "best score is re-read, not reset");
        assert_eq!(state.board.tiles().collect::<Vec<_>>(), vec![2, 2]);
        assert!(!state.can_undo);
        assert!(!store.undo());

        let saved = storage
            .read_game_state()
            .expect("read should succeed")
            .expect("new game should be saved");
        assert_eq!(saved.board, state.board);
        assert_eq!(saved.score, 0);
    }

    #[test]
    fn game_over_blocks_moves() {
        let (mut store, storage) = store_with(open_board());
        storage
            .write_game_state(&SavedGame {
                board: open_board(),
                score: 0,
                game_over: true,
                won: false,
                can_undo: false,
            })
            .expect("seeding storage should succeed");
        let mut over = GameStore::with_seed(GameConfig::default(), Rc::clone(&storage), 2);
        assert!(!over.move_tiles(Direction::Left));
        assert!(store.move_tiles(Direction::Left));
    }

    #[test]
    fn storage_failures_do_not_abort_transitions() {
        let (mut store, storage) = store_with(open_board());
        storage.set_offline(true);

        assert!(store.move_tiles(Direction::Left));
        assert_eq!(store.state().score, 4);
        assert!(store.undo());
        store.new_game();
        assert_eq!(store.state().best_score, 0);

        storage.set_offline(false);
        assert_eq!(storage.raw(BEST_SCORE_KEY), None);
    }

    #[test]
    fn unreadable_storage_starts_fresh() {
        init_logging();
        let storage = Rc::new(MemoryStorage::new());
        storage.insert_raw(GAME_STATE_KEY, "{not json");
        storage.insert_raw(BEST_SCORE_KEY, "NaN");
        let store = GameStore::with_seed(GameConfig::default(), Rc::clone(&storage), 5);
        assert_eq!(store.state().best_score, 0);
        assert_eq!(store.state().board.tile_count(), 2);
    }

    #[test]
    fn suggestions_are_validated_like_input() {
        let (mut store, _) = store_with(open_board());
        let snapshot = store.hint_snapshot();
        assert_eq!(snapshot.board, open_board());

        let blocked = board(&[&[2, 0, 0, 0], &[4, 0, 0, 0], &[8, 0, 0, 0], &[16, 0, 0, 0]]);
        let (mut stuck, _) = store_with(blocked);
        assert!(!stuck.apply_suggestion(Direction::Left));
        assert!(store.apply_suggestion(Direction::Left));
    }

    #[test]
    fn win_stays_after_further_moves() {
        let winning = board(&[&[1024, 1024, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0]]);
        let (mut store, _) = store_with(winning);
        assert!(store.move_tiles(Direction::Left));
        assert!(store.state().won);

        for _ in 0..4 {
            for direction in Direction::ALL {
                store.move_tiles(direction);
            }
        }
        assert!(store.state().won);
    }
}
