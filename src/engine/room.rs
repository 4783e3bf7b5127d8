//! Room lifecycle mutators: create, join, leave, config update.

use super::{normalize_code, player_path, players_path, room_path, GameEngine};
use crate::cards;
use crate::error::GameError;
use crate::rules;
use crate::store::{StoreError, Tx};
use crate::types::{GamePhase, Player, Room, RoomCode, RoomConfig, RoomStatus};
use chrono::Utc;
use std::collections::HashMap;

impl GameEngine {
    /// Create a room in the lobby with the caller as sole player and
    /// host. Retries fresh random codes on collision, bounded.
    pub async fn create_room(
        &self,
        host_id: &str,
        host_name: &str,
        config: RoomConfig,
    ) -> Result<RoomCode, GameError> {
        for _ in 0..self.config.code_attempts {
            let code = cards::generate_room_code();
            let mut tx = Tx::begin(self.store.as_ref());

            // Reading absence puts the code into the read set, so a
            // concurrent creator of the same code conflicts at commit.
            if tx.get::<Room>(&room_path(&code)).await?.is_some() {
                continue;
            }

            let now = Utc::now();
            let room = Room {
                room_code: code.clone(),
                host_id: host_id.to_string(),
                status: RoomStatus::Lobby,
                phase: GamePhase::Selection,
                current_round: 0,
                config: config.clone(),
                zar_player_id: host_id.to_string(),
                zar_rotation_index: 0,
                current_prompt_card: None,
                submissions: HashMap::new(),
                submission_map: HashMap::new(),
                submitted_count: 0,
                winner_player_ids: Vec::new(),
                player_order: vec![host_id.to_string()],
                created_at: now,
            };
            let host = Player {
                id: host_id.to_string(),
                name: host_name.to_string(),
                hand: Vec::new(),
                points: 0,
                is_host: true,
                has_submitted: false,
                order_index: 0,
                active: true,
                joined_at: now,
            };

            tx.set(&room_path(&code), &room)?;
            tx.set(&player_path(&code, host_id), &host)?;

            match tx.commit().await {
                Ok(()) => {
                    tracing::info!(room = %code, host = host_id, "room created");
                    return Ok(code);
                }
                // Lost the code to a concurrent creator, draw another
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(GameError::RoomCodeExhausted)
    }

    /// Join an open lobby. Re-joining with a known client id only
    /// refreshes the display name.
    pub async fn join_room(
        &self,
        room_code: &str,
        player_id: &str,
        name: &str,
    ) -> Result<(), GameError> {
        let code = normalize_code(room_code);
        self.retrying("join_room", || self.try_join_room(&code, player_id, name))
            .await
    }

    async fn try_join_room(
        &self,
        code: &str,
        player_id: &str,
        name: &str,
    ) -> Result<(), GameError> {
        let mut tx = Tx::begin(self.store.as_ref());
        let mut room: Room = tx
            .get(&room_path(code))
            .await?
            .ok_or_else(|| GameError::RoomNotFound(code.to_string()))?;
        rules::can_join(&room)?;

        if let Some(mut player) = tx.get::<Player>(&player_path(code, player_id)).await? {
            player.name = name.to_string();
            player.active = true;
            tx.set(&player_path(code, player_id), &player)?;
            tx.commit().await?;
            return Ok(());
        }

        let existing: Vec<Player> = tx.list(&players_path(code)).await?;
        let player = Player {
            id: player_id.to_string(),
            name: name.to_string(),
            hand: Vec::new(),
            points: 0,
            is_host: false,
            has_submitted: false,
            order_index: existing.len() as u32,
            active: true,
            joined_at: Utc::now(),
        };
        room.player_order.push(player_id.to_string());

        tx.set(&player_path(code, player_id), &player)?;
        tx.set(&room_path(code), &room)?;
        tx.commit().await?;

        tracing::info!(room = %code, player = player_id, "player joined");
        Ok(())
    }

    /// Mark a player inactive. Missing player records are tolerated
    /// silently; the player document is never deleted so the fixed
    /// rotation order keeps its indices.
    pub async fn leave_room(&self, room_code: &str, player_id: &str) -> Result<(), GameError> {
        let code = normalize_code(room_code);
        self.retrying("leave_room", || self.try_leave_room(&code, player_id))
            .await
    }

    async fn try_leave_room(&self, code: &str, player_id: &str) -> Result<(), GameError> {
        let mut tx = Tx::begin(self.store.as_ref());
        match tx.get::<Player>(&player_path(code, player_id)).await? {
            Some(mut player) => {
                player.active = false;
                tx.set(&player_path(code, player_id), &player)?;
                tx.commit().await?;
                tracing::info!(room = %code, player = player_id, "player left");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Replace the room config while the lobby is still open.
    pub async fn update_config(
        &self,
        room_code: &str,
        config: RoomConfig,
    ) -> Result<(), GameError> {
        let code = normalize_code(room_code);
        self.retrying("update_config", || self.try_update_config(&code, &config))
            .await
    }

    async fn try_update_config(&self, code: &str, config: &RoomConfig) -> Result<(), GameError> {
        let mut tx = Tx::begin(self.store.as_ref());
        let mut room: Room = tx
            .get(&room_path(code))
            .await?
            .ok_or_else(|| GameError::RoomNotFound(code.to_string()))?;
        if room.status != RoomStatus::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        room.config = config.clone();
        tx.set(&room_path(code), &room)?;
        tx.commit().await?;
        Ok(())
    }
}
