use std::time::Instant;

use crate::session::GAME_DURATION_SECS;

/// Hint displayed for the player's current level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    /// Riddle text pointing at the next code's location.
    pub text: String,
    /// Optional supplementary background text.
    pub educational_text: Option<String>,
}

/// Per-player record tracked for the lifetime of one hunt.
///
/// Mutated only by the session state machine; the backend's view of level
/// and time overrides the local fields at bootstrap and completion.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    /// Opaque identity issued at registration.
    pub player_id: String,
    /// Last level confirmed by the backend. Only ever increases, by one.
    pub current_level: u32,
    /// Local countdown approximation, decremented once per clock tick.
    pub time_left_seconds: u32,
    /// Server-accounted completion time. Set once, immutable after set.
    pub completion_time_seconds: Option<u32>,
    /// Hint currently on display, if one has been revealed or seeded.
    pub hint: Option<Hint>,
    /// Last user-visible message; cleared on the next successful transition.
    pub notice: Option<String>,
}

impl PlayerSession {
    /// Fresh record with the full play budget and no progress.
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            current_level: 0,
            time_left_seconds: GAME_DURATION_SECS,
            completion_time_seconds: None,
            hint: None,
            notice: None,
        }
    }

    /// Record the completion time unless one was already set.
    pub(crate) fn record_completion(&mut self, seconds: u32) {
        self.completion_time_seconds.get_or_insert(seconds);
    }
}

/// Context for one admitted scan, alive for a single admission cycle.
#[derive(Debug, Clone)]
pub struct ScanAttempt {
    /// Decoded text exactly as produced by the decoder.
    pub raw_code: String,
    /// Level this attempt tries to unlock (current level + 1).
    pub target_level: u32,
    /// When the attempt was admitted, for round-trip diagnostics.
    pub submitted_at: Instant,
    /// Passthrough flag telling the backend to skip code validation.
    pub debug: bool,
}

impl ScanAttempt {
    /// Stamp a new attempt at admission time.
    pub fn new(raw_code: String, target_level: u32, debug: bool) -> Self {
        Self {
            raw_code,
            target_level,
            submitted_at: Instant::now(),
            debug,
        }
    }
}
