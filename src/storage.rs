//! Persistence collaborators for the best score and the in-progress game.
//!
//! Every write is best effort: callers log failures and carry on, so a
//! broken storage backend can never roll back an in-memory transition.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::game::config::{BEST_SCORE_KEY, GAME_STATE_KEY};
use crate::game::SavedGame;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum StorageError {
    Unavailable,
    Read { key: String, message: String },
    Write { key: String, message: String },
    Corrupt { key: String, message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable => f.write_str("storage is unavailable"),
            StorageError::Read { key, message } => write!(f, "failed to read {key}: {message}"),
            StorageError::Write { key, message } => write!(f, "failed to write {key}: {message}"),
            StorageError::Corrupt { key, message } => write!(f, "corrupt value in {key}: {message}"),
        }
    }
}

impl std::error::Error for StorageError {}

pub trait BestScoreStore {
    /// `Ok(None)` when nothing has been stored yet.
    fn read_best_score(&self) -> Result<Option<u64>, StorageError>;
    fn write_best_score(&self, value: u64) -> Result<(), StorageError>;
}

pub trait GameStateStore {
    fn read_game_state(&self) -> Result<Option<SavedGame>, StorageError>;
    fn write_game_state(&self, game: &SavedGame) -> Result<(), StorageError>;
    fn clear_game_state(&self) -> Result<(), StorageError>;
}

/// Both stores behind one backend.
pub trait Storage: BestScoreStore + GameStateStore {}

impl<T: BestScoreStore + GameStateStore> Storage for T {}

/// Minimal string key/value backend shared by the concrete stores.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn parse_best_score(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

impl<B: KeyValueBackend> BestScoreStore for B {
    fn read_best_score(&self) -> Result<Option<u64>, StorageError> {
        let Some(raw) = self.get(BEST_SCORE_KEY)? else {
            return Ok(None);
        };
        parse_best_score(&raw).map(Some).ok_or_else(|| {
            warn!("[Storage] Unparseable best score under {BEST_SCORE_KEY}: {raw:?}");
            StorageError::Corrupt {
                key: BEST_SCORE_KEY.into(),
                message: format!("not a score: {raw:?}"),
            }
        })
    }

    fn write_best_score(&self, value: u64) -> Result<(), StorageError> {
        debug!("[Storage] Writing best score {value}");
        self.set(BEST_SCORE_KEY, &value.to_string())
    }
}

impl<B: KeyValueBackend> GameStateStore for B {
    fn read_game_state(&self) -> Result<Option<SavedGame>, StorageError> {
        let Some(raw) = self.get(GAME_STATE_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|error| {
            warn!("[Storage] Discarding corrupt game state under {GAME_STATE_KEY}: {error}");
            StorageError::Corrupt {
                key: GAME_STATE_KEY.into(),
                message: error.to_string(),
            }
        })
    }

    fn write_game_state(&self, game: &SavedGame) -> Result<(), StorageError> {
        let json = serde_json::to_string(game).map_err(|error| StorageError::Write {
            key: GAME_STATE_KEY.into(),
            message: error.to_string(),
        })?;
        debug!("[Storage] Writing game state, {} bytes", json.len());
        self.set(GAME_STATE_KEY, &json)
    }

    fn clear_game_state(&self) -> Result<(), StorageError> {
        debug!("[Storage] Clearing game state");
        self.remove(GAME_STATE_KEY)
    }
}

/// In-process backend. Can be switched offline to mimic a browser with
/// storage disabled.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
    offline: Cell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.offline.get() {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }
}

impl KeyValueBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.ensure_online()?;
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_online()?;
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_online()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for std::rc::Rc<B> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::LocalStorage;

#[cfg(target_arch = "wasm32")]
mod browser {
    use log::warn;
    use wasm_bindgen::JsValue;

    use super::{KeyValueBackend, StorageError};

    fn describe(error: JsValue) -> String {
        error
            .as_string()
            .unwrap_or_else(|| format!("{error:?}"))
    }

    /// `window.localStorage`, looked up on every call so that a storage
    /// disabled mid-session degrades to errors instead of panics.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LocalStorage;

    impl LocalStorage {
        fn storage(&self) -> Result<web_sys::Storage, StorageError> {
            web_sys::window()
                .and_then(|window| window.local_storage().ok().flatten())
                .ok_or_else(|| {
                    warn!("[Storage] localStorage is not available");
                    StorageError::Unavailable
                })
        }
    }

    impl KeyValueBackend for LocalStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.storage()?
                .get_item(key)
                .map_err(|error| StorageError::Read {
                    key: key.into(),
                    message: describe(error),
                })
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.storage()?
                .set_item(key, value)
                .map_err(|error| StorageError::Write {
                    key: key.into(),
                    message: describe(error),
                })
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.storage()?
                .remove_item(key)
                .map_err(|error| StorageError::Write {
                    key: key.into(),
                    message: describe(error),
                })
        }
    }
}
