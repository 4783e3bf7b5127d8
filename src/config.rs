/// Engine tunables. The defaults match the reference client; the env
/// overrides exist mostly for the simulator and for tests that want
/// tiny hands.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cards every player holds at the start of a round
    pub hand_size: usize,
    /// Minimum players before a game may start
    pub min_players: usize,
    /// Fresh room codes tried before giving up on a collision streak
    pub code_attempts: usize,
    /// Times a conflicting transaction is re-run before surfacing
    pub tx_attempts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hand_size: 10,
            min_players: 2,
            code_attempts: 10,
            tx_attempts: 5,
        }
    }
}

impl EngineConfig {
    /// Load config from environment variables, falling back to
    /// defaults and warning on unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hand_size: env_usize("ZAR_HAND_SIZE", defaults.hand_size),
            min_players: env_usize("ZAR_MIN_PLAYERS", defaults.min_players),
            code_attempts: env_usize("ZAR_CODE_ATTEMPTS", defaults.code_attempts),
            tx_attempts: env_usize("ZAR_TX_ATTEMPTS", defaults.tx_attempts),
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) if value > 0 => value,
            _ => {
                tracing::warn!("{} is not a positive integer ({:?}), using {}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
