//! Game start and phase advancement.

use super::{deck_path, normalize_code, player_path, players_path, room_path, GameEngine};
use crate::cards;
use crate::error::GameError;
use crate::rules;
use crate::store::Tx;
use crate::types::{CardSet, Deck, GamePhase, Player, PlayerId, Room, RoomStatus};
use rand::seq::SliceRandom;

impl GameEngine {
    /// Start the game: build and shuffle the decks, randomize the
    /// rotation order, deal every player a full hand, set the first
    /// prompt and Zar.
    pub async fn start_game(&self, room_code: &str, sets: &[CardSet]) -> Result<(), GameError> {
        let code = normalize_code(room_code);
        self.retrying("start_game", || self.try_start_game(&code, sets))
            .await
    }

    async fn try_start_game(&self, code: &str, sets: &[CardSet]) -> Result<(), GameError> {
        let mut tx = Tx::begin(self.store.as_ref());
        let mut room: Room = tx
            .get(&room_path(code))
            .await?
            .ok_or_else(|| GameError::RoomNotFound(code.to_string()))?;
        let mut players: Vec<Player> = tx.list(&players_path(code)).await?;

        let (prompts, answers) = cards::build_deck(sets, &room.config.selected_sets);
        rules::can_start(
            &room,
            players.len(),
            self.config.min_players,
            prompts.len(),
            answers.len(),
        )?;

        let mut deck = Deck::new(prompts, answers);

        // The shuffled order fixes the Zar rotation for the whole game
        let mut order: Vec<PlayerId> = players.iter().map(|p| p.id.clone()).collect();
        order.shuffle(&mut rand::rng());

        // Contiguous non-overlapping slices off the shared cursor
        for player in &mut players {
            player.hand = deck.draw_answers(self.config.hand_size);
            player.has_submitted = false;
            tx.set(&player_path(code, &player.id), player)?;
        }

        room.status = RoomStatus::Playing;
        room.phase = GamePhase::Selection;
        room.current_round = 1;
        room.zar_player_id = order[0].clone();
        room.zar_rotation_index = 0;
        room.player_order = order;
        room.current_prompt_card = deck.draw_prompt();
        room.submissions.clear();
        room.submission_map.clear();
        room.submitted_count = 0;
        room.winner_player_ids.clear();

        tx.set(&deck_path(code), &deck)?;
        tx.set(&room_path(code), &room)?;
        tx.commit().await?;

        tracing::info!(room = %code, players = players.len(), "game started");
        Ok(())
    }

    /// Advance selection -> reveal once every active non-Zar player
    /// has submitted. Any client may fire this; losing the race or
    /// firing early is a silent no-op. Returns whether it advanced.
    pub async fn advance_to_reveal(&self, room_code: &str) -> Result<bool, GameError> {
        let code = normalize_code(room_code);
        self.retrying("advance_to_reveal", || self.try_advance_to_reveal(&code))
            .await
    }

    async fn try_advance_to_reveal(&self, code: &str) -> Result<bool, GameError> {
        let mut tx = Tx::begin(self.store.as_ref());
        let Some(mut room) = tx.get::<Room>(&room_path(code)).await? else {
            return Ok(false);
        };
        if room.status != RoomStatus::Playing
            || !rules::is_valid_phase_transition(room.phase, GamePhase::Reveal)
        {
            return Ok(false);
        }
        let players: Vec<Player> = tx.list(&players_path(code)).await?;
        if !rules::all_submitted(&room, &players) {
            return Ok(false);
        }

        room.phase = GamePhase::Reveal;
        tx.set(&room_path(code), &room)?;
        tx.commit().await?;

        tracing::debug!(room = %code, "advanced to reveal");
        Ok(true)
    }

    /// Advance reveal -> verdict. Zar-triggered, unconditional beyond
    /// the phase guard; a no-op anywhere else. Returns whether it
    /// advanced.
    pub async fn advance_to_verdict(&self, room_code: &str) -> Result<bool, GameError> {
        let code = normalize_code(room_code);
        self.retrying("advance_to_verdict", || self.try_advance_to_verdict(&code))
            .await
    }

    async fn try_advance_to_verdict(&self, code: &str) -> Result<bool, GameError> {
        let mut tx = Tx::begin(self.store.as_ref());
        let Some(mut room) = tx.get::<Room>(&room_path(code)).await? else {
            return Ok(false);
        };
        if room.status != RoomStatus::Playing
            || !rules::is_valid_phase_transition(room.phase, GamePhase::Verdict)
        {
            return Ok(false);
        }

        room.phase = GamePhase::Verdict;
        tx.set(&room_path(code), &room)?;
        tx.commit().await?;

        tracing::debug!(room = %code, "advanced to verdict");
        Ok(true)
    }
}
