//! In-round mutators: submissions, verdict resolution, round rollover.

use super::{deck_path, normalize_code, player_path, players_path, room_path, GameEngine};
use crate::error::GameError;
use crate::rules;
use crate::store::Tx;
use crate::types::{Deck, GamePhase, Player, PlayerId, Room, RoomStatus, SubmissionId};
use std::collections::HashMap;

impl GameEngine {
    /// Play cards for the current prompt. The submission is recorded
    /// anonymously under a fresh id; the de-anonymizing link goes into
    /// `submissionMap` for verdict resolution.
    pub async fn submit_cards(
        &self,
        room_code: &str,
        player_id: &str,
        cards: &[String],
    ) -> Result<(), GameError> {
        let code = normalize_code(room_code);
        // Generated once so a retried transaction keeps the same id
        let submission_id = ulid::Ulid::new().to_string();
        self.retrying("submit_cards", || {
            self.try_submit_cards(&code, player_id, cards, &submission_id)
        })
        .await
    }

    async fn try_submit_cards(
        &self,
        code: &str,
        player_id: &str,
        cards: &[String],
        submission_id: &str,
    ) -> Result<(), GameError> {
        let mut tx = Tx::begin(self.store.as_ref());
        let mut room: Room = tx
            .get(&room_path(code))
            .await?
            .ok_or_else(|| GameError::RoomNotFound(code.to_string()))?;
        let mut player: Player = tx
            .get(&player_path(code, player_id))
            .await?
            .ok_or(GameError::StaleTransition("no player record in this room"))?;

        rules::can_submit(&room, &player)?;

        if let Some(prompt) = &room.current_prompt_card {
            if cards.len() != prompt.pick as usize {
                return Err(GameError::InvalidPlay(
                    "submission size does not match the prompt",
                ));
            }
        }

        // Move the played cards out of the hand, one copy per card
        for card in cards {
            match player.hand.iter().position(|c| c == card) {
                Some(idx) => {
                    player.hand.remove(idx);
                }
                None => return Err(GameError::InvalidPlay("card is not in your hand")),
            }
        }

        player.has_submitted = true;
        room.submissions
            .insert(submission_id.to_string(), cards.to_vec());
        room.submission_map
            .insert(player_id.to_string(), submission_id.to_string());
        room.submitted_count += 1;

        tx.set(&player_path(code, player_id), &player)?;
        tx.set(&room_path(code), &room)?;
        tx.commit().await?;

        tracing::debug!(room = %code, player = player_id, "cards submitted");
        Ok(())
    }

    /// Resolve the verdict: one submission id per blank, in blank
    /// order. Each resolves to a player through `submissionMap` and
    /// awards one point per blank filled; unknown ids are skipped.
    /// Ends the game in the same transaction when a winner reaches
    /// `maxPoints` or the round limit is hit.
    pub async fn pick_winners(
        &self,
        room_code: &str,
        submission_ids: &[SubmissionId],
    ) -> Result<(), GameError> {
        let code = normalize_code(room_code);
        self.retrying("pick_winners", || {
            self.try_pick_winners(&code, submission_ids)
        })
        .await
    }

    async fn try_pick_winners(
        &self,
        code: &str,
        submission_ids: &[SubmissionId],
    ) -> Result<(), GameError> {
        let mut tx = Tx::begin(self.store.as_ref());
        let mut room: Room = tx
            .get(&room_path(code))
            .await?
            .ok_or_else(|| GameError::RoomNotFound(code.to_string()))?;

        if room.status != RoomStatus::Playing || room.phase != GamePhase::Verdict {
            return Err(GameError::StaleTransition("the verdict is not open"));
        }
        if !room.winner_player_ids.is_empty() {
            return Err(GameError::StaleTransition("the verdict is already resolved"));
        }
        if let Some(prompt) = &room.current_prompt_card {
            if submission_ids.len() != prompt.pick as usize {
                return Err(GameError::InvalidPlay("one winner per blank"));
            }
        }

        // Reverse the player -> submission link for per-blank lookup
        let by_submission: HashMap<SubmissionId, PlayerId> = room
            .submission_map
            .iter()
            .map(|(pid, sid)| (sid.clone(), pid.clone()))
            .collect();

        let mut winner_ids: Vec<PlayerId> = Vec::new();
        let mut awards: HashMap<PlayerId, u32> = HashMap::new();
        for sid in submission_ids {
            if let Some(pid) = by_submission.get(sid) {
                winner_ids.push(pid.clone());
                *awards.entry(pid.clone()).or_insert(0) += 1;
            }
        }

        // Award points; the best new total decides end of game
        let mut best_points = 0;
        for (pid, points) in &awards {
            let Some(mut player) = tx.get::<Player>(&player_path(code, pid)).await? else {
                continue;
            };
            player.points += points;
            best_points = best_points.max(player.points);
            tx.set(&player_path(code, pid), &player)?;
        }

        room.winner_player_ids = winner_ids;
        if rules::is_game_over(&room, best_points) {
            room.status = RoomStatus::Finished;
            tracing::info!(room = %code, round = room.current_round, "game finished");
        }

        tx.set(&room_path(code), &room)?;
        tx.commit().await?;
        Ok(())
    }

    /// Roll over to the next round: rotate the Zar along the fixed
    /// order, deal the next prompt, top every hand back up to the
    /// hand size, and reset the per-round submission state.
    pub async fn next_round(&self, room_code: &str) -> Result<(), GameError> {
        let code = normalize_code(room_code);
        self.retrying("next_round", || self.try_next_round(&code)).await
    }

    async fn try_next_round(&self, code: &str) -> Result<(), GameError> {
        let mut tx = Tx::begin(self.store.as_ref());
        let mut room: Room = tx
            .get(&room_path(code))
            .await?
            .ok_or_else(|| GameError::RoomNotFound(code.to_string()))?;
        let mut deck: Deck = tx
            .get(&deck_path(code))
            .await?
            .ok_or(GameError::StaleTransition("the game has not started"))?;

        if room.status != RoomStatus::Playing {
            return Err(GameError::StaleTransition("the game is not in progress"));
        }

        room.zar_rotation_index = (room.zar_rotation_index + 1) % room.player_order.len();
        room.zar_player_id = room.player_order[room.zar_rotation_index].clone();
        room.current_prompt_card = deck.draw_prompt();

        // Top up, never trim
        let players: Vec<Player> = tx.list(&players_path(code)).await?;
        for mut player in players {
            let needed = self.config.hand_size.saturating_sub(player.hand.len());
            if needed > 0 {
                player.hand.extend(deck.draw_answers(needed));
            }
            player.has_submitted = false;
            tx.set(&player_path(code, &player.id), &player)?;
        }

        room.phase = GamePhase::Selection;
        room.current_round += 1;
        room.submissions.clear();
        room.submission_map.clear();
        room.submitted_count = 0;
        room.winner_player_ids.clear();

        tx.set(&deck_path(code), &deck)?;
        tx.set(&room_path(code), &room)?;
        tx.commit().await?;

        tracing::info!(room = %code, round = room.current_round, zar = %room.zar_player_id, "next round");
        Ok(())
    }
}
