use crate::store::StoreError;

/// Errors surfaced to callers of the game engine.
///
/// Auto-triggered transitions losing a race report no error at all;
/// player-facing mutators fail loudly so the UI can resync.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("room {0} not found")]
    RoomNotFound(String),

    #[error("the game has already started")]
    GameAlreadyStarted,

    #[error("at least {0} players are required to start")]
    InsufficientPlayers(usize),

    #[error("the selected card sets contain no cards")]
    EmptyDeckSelection,

    /// A precondition held when the caller acted but no longer holds
    /// against the freshly-read state (phase moved on, already
    /// submitted, ...). Harmless to re-attempt.
    #[error("action no longer valid: {0}")]
    StaleTransition(&'static str),

    /// A malformed player action that could never have been valid:
    /// wrong card count, cards not in the hand, the Zar submitting.
    #[error("invalid play: {0}")]
    InvalidPlay(&'static str),

    #[error("could not allocate a unique room code")]
    RoomCodeExhausted,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    /// True when the underlying store reported a write conflict and
    /// the whole transaction can simply run again.
    pub fn is_conflict(&self) -> bool {
        matches!(self, GameError::Store(StoreError::Conflict))
    }
}
