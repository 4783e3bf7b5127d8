use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type SubmissionId = String;
pub type RoomCode = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Lobby,
    Playing,
    Finished,
}

/// Round phase; only meaningful while the room status is `Playing`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Selection,
    Reveal,
    Verdict,
}

/// A prompt card with one or more blanks. `pick` is how many answer
/// cards a submission must combine to fill it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptCard {
    pub text: String,
    pub pick: u32,
}

/// A catalog card set, as loaded from a JSON set file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSet {
    pub name: String,
    pub code_name: String,
    #[serde(default)]
    pub official: bool,
    pub prompt_cards: Vec<PromptCard>,
    pub answer_cards: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfig {
    pub max_points: u32,
    /// None = play until someone reaches `max_points`
    pub max_rounds: Option<u32>,
    /// Set code names merged into the deck at game start
    pub selected_sets: Vec<String>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_points: 8,
            max_rounds: None,
            selected_sets: Vec::new(),
        }
    }
}

/// The room document, one per game instance, keyed by room code.
///
/// `submissions` is anonymous and visible to everyone; `submissionMap`
/// is the de-anonymizing link, resolved by the Zar at verdict time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_code: RoomCode,
    pub host_id: PlayerId,
    pub status: RoomStatus,
    pub phase: GamePhase,
    pub current_round: u32,
    pub config: RoomConfig,
    pub zar_player_id: PlayerId,
    pub zar_rotation_index: usize,
    pub current_prompt_card: Option<PromptCard>,
    pub submissions: HashMap<SubmissionId, Vec<String>>,
    pub submission_map: HashMap<PlayerId, SubmissionId>,
    pub submitted_count: u32,
    /// One entry per blank filled by the Zar's picks, in blank order
    pub winner_player_ids: Vec<PlayerId>,
    /// Fixed once the game starts; defines Zar rotation
    pub player_order: Vec<PlayerId>,
    pub created_at: DateTime<Utc>,
}

/// A participant document, one per player per room. Never deleted:
/// leaving only flips `active`, so `playerOrder` indexing stays valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hand: Vec<String>,
    pub points: u32,
    pub is_host: bool,
    pub has_submitted: bool,
    /// Join order; only used before the game starts
    pub order_index: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    pub joined_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// The deck document, stored apart from the room to keep the
/// frequently-updated room document small. Deal cursors grow
/// monotonically and are applied modulo deck length, so the deck is
/// cyclic: cards recycle once exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub prompt_cards: Vec<PromptCard>,
    pub answer_cards: Vec<String>,
    pub prompt_deal_index: usize,
    pub answer_deal_index: usize,
}

impl Deck {
    pub fn new(prompt_cards: Vec<PromptCard>, answer_cards: Vec<String>) -> Self {
        Self {
            prompt_cards,
            answer_cards,
            prompt_deal_index: 0,
            answer_deal_index: 0,
        }
    }

    /// Draw the next `n` answer cards, wrapping around the deck.
    pub fn draw_answers(&mut self, n: usize) -> Vec<String> {
        if self.answer_cards.is_empty() {
            return Vec::new();
        }
        let mut drawn = Vec::with_capacity(n);
        for _ in 0..n {
            let idx = self.answer_deal_index % self.answer_cards.len();
            drawn.push(self.answer_cards[idx].clone());
            self.answer_deal_index += 1;
        }
        drawn
    }

    /// Draw the next prompt card, wrapping around the deck.
    pub fn draw_prompt(&mut self) -> Option<PromptCard> {
        if self.prompt_cards.is_empty() {
            return None;
        }
        let idx = self.prompt_deal_index % self.prompt_cards.len();
        self.prompt_deal_index += 1;
        Some(self.prompt_cards[idx].clone())
    }
}
