//! The transactional mutators. Every game action is one optimistic
//! read-modify-write against the document store: read fresh state,
//! validate it with the `rules` module, buffer the new documents,
//! commit. A lost race either retries (conflict) or degrades into a
//! silent no-op or a surfaced error, depending on the action.

mod game;
mod room;
mod round;

use crate::config::EngineConfig;
use crate::error::GameError;
use crate::store::{ChangeEvent, DocPath, DocumentStore, StoreError};
use crate::types::{Deck, Player, Room};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

// Document addressing. One room document, one player sub-document per
// participant, and the deck kept apart so the hot room document stays
// small.

pub(crate) fn room_path(code: &str) -> DocPath {
    DocPath::new(&["rooms", code])
}

pub(crate) fn players_path(code: &str) -> DocPath {
    DocPath::new(&["rooms", code, "players"])
}

pub(crate) fn player_path(code: &str, player_id: &str) -> DocPath {
    players_path(code).child(player_id)
}

pub(crate) fn deck_path(code: &str) -> DocPath {
    DocPath::new(&["rooms", code, "deck", "main"])
}

/// Room codes are case-insensitive on every lookup.
pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Game engine over a shared document store. Cheap to clone; every
/// client holds one and invokes mutators independently, the store's
/// transaction layer being the only synchronization point.
#[derive(Clone)]
pub struct GameEngine {
    store: Arc<dyn DocumentStore>,
    config: EngineConfig,
}

impl GameEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn DocumentStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Change feed of every committed write; clients re-read and
    /// re-render on notification.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.store.subscribe()
    }

    /// Point read of a room document.
    pub async fn room(&self, room_code: &str) -> Result<Option<Room>, GameError> {
        let code = normalize_code(room_code);
        match self.store.get_versioned(&room_path(&code)).await? {
            Some((value, _)) => Ok(Some(
                serde_json::from_value(value).map_err(StoreError::from)?,
            )),
            None => Ok(None),
        }
    }

    /// All players of a room, in join order.
    pub async fn players(&self, room_code: &str) -> Result<Vec<Player>, GameError> {
        let code = normalize_code(room_code);
        let docs = self.store.list_versioned(&players_path(&code)).await?;
        let mut players = Vec::with_capacity(docs.len());
        for (_, value, _) in docs {
            players.push(serde_json::from_value::<Player>(value).map_err(StoreError::from)?);
        }
        players.sort_by_key(|p| p.order_index);
        Ok(players)
    }

    /// Point read of a room's deck document.
    pub async fn deck(&self, room_code: &str) -> Result<Option<Deck>, GameError> {
        let code = normalize_code(room_code);
        match self.store.get_versioned(&deck_path(&code)).await? {
            Some((value, _)) => Ok(Some(
                serde_json::from_value(value).map_err(StoreError::from)?,
            )),
            None => Ok(None),
        }
    }

    /// Re-run a mutator when the store reports a commit conflict, up
    /// to the configured attempt budget.
    async fn retrying<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, GameError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GameError>>,
    {
        let mut attempt = 1;
        loop {
            match f().await {
                Err(e) if e.is_conflict() && attempt < self.config.tx_attempts => {
                    tracing::debug!(op, attempt, "transaction conflict, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
