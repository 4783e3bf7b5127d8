//! The game state machine: pure validity checks over freshly-read
//! snapshots. The transactional mutators call these against the state
//! they just read, never against anything captured earlier.

use crate::error::GameError;
use crate::types::{GamePhase, Player, PlayerId, Room, RoomStatus};

/// Check if a phase transition is valid while the game is playing
pub fn is_valid_phase_transition(from: GamePhase, to: GamePhase) -> bool {
    use GamePhase::*;

    matches!(
        (from, to),
        (Selection, Reveal) | (Reveal, Verdict) | (Verdict, Selection)
    )
}

/// Join eligibility: only open lobbies accept new players.
pub fn can_join(room: &Room) -> Result<(), GameError> {
    match room.status {
        RoomStatus::Lobby => Ok(()),
        _ => Err(GameError::GameAlreadyStarted),
    }
}

/// Start eligibility: enough players and a non-empty merged deck.
pub fn can_start(
    room: &Room,
    player_count: usize,
    min_players: usize,
    prompt_count: usize,
    answer_count: usize,
) -> Result<(), GameError> {
    if room.status != RoomStatus::Lobby {
        return Err(GameError::GameAlreadyStarted);
    }
    if player_count < min_players {
        return Err(GameError::InsufficientPlayers(min_players));
    }
    if prompt_count == 0 || answer_count == 0 {
        return Err(GameError::EmptyDeckSelection);
    }
    Ok(())
}

/// How many players must submit this round: everyone active except the Zar.
pub fn required_submitters(players: &[Player], zar: &PlayerId) -> usize {
    players
        .iter()
        .filter(|p| p.active && p.id != *zar)
        .count()
}

/// Advance condition for selection -> reveal.
pub fn all_submitted(room: &Room, players: &[Player]) -> bool {
    room.submitted_count as usize >= required_submitters(players, &room.zar_player_id)
}

/// Submission eligibility for one player, against the current snapshot.
pub fn can_submit(room: &Room, player: &Player) -> Result<(), GameError> {
    if room.status != RoomStatus::Playing || room.phase != GamePhase::Selection {
        return Err(GameError::StaleTransition("submissions are closed"));
    }
    if player.id == room.zar_player_id {
        return Err(GameError::InvalidPlay("the Zar does not submit"));
    }
    if player.has_submitted {
        return Err(GameError::StaleTransition("already submitted this round"));
    }
    Ok(())
}

/// End-of-game test, evaluated inside the verdict transaction.
/// `best_points` is the highest point total after this round's awards.
pub fn is_game_over(room: &Room, best_points: u32) -> bool {
    if best_points >= room.config.max_points {
        return true;
    }
    match room.config.max_rounds {
        Some(max) => room.current_round >= max,
        None => false,
    }
}
