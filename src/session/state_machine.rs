use thiserror::Error;

use crate::{
    error::GameErrorKind,
    session::player::{Hint, PlayerSession},
};

/// Phases a hunt session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the authoritative state fetch to finish.
    Bootstrapping,
    /// The player is hunting; codes can be admitted.
    InProgress,
    /// One scan attempt is in flight, awaiting the backend verdict.
    AwaitingResult,
    /// Final code scanned; completion time recorded.
    Completed,
    /// Time budget exhausted, locally or by backend accounting.
    Expired,
    /// The backend no longer knows this player; re-registration required.
    Invalid,
}

impl Phase {
    /// Terminal phases admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Expired | Phase::Invalid)
    }
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Bootstrap fetch succeeded with a running session.
    BootstrapLoaded {
        /// Server-owned level to resume from.
        current_level: u32,
        /// Server-accounted remaining budget in seconds.
        time_left: u32,
    },
    /// Bootstrap fetch reported the game already finished.
    BootstrapCompleted {
        /// Server-accounted completion time in seconds.
        completion_time: u32,
    },
    /// The scan gate admitted an attempt; a submission is in flight.
    ScanAdmitted,
    /// The backend confirmed the code and revealed the next hint.
    HintRevealed {
        /// Hint for the newly reached level.
        hint: Hint,
    },
    /// The backend confirmed the final code.
    GameCompleted {
        /// Server-accounted completion time in seconds.
        completion_time: u32,
    },
    /// The backend acknowledged the scan without progression.
    ScanNotice {
        /// Message to surface in place of an error.
        message: String,
    },
    /// The scan failed recoverably; level and hint stay untouched.
    ScanFailed {
        /// Classified failure. Fatal kinds use the dedicated events instead.
        kind: GameErrorKind,
    },
    /// The backend reported the time budget exhausted.
    TimeExpired,
    /// The backend reported the player unknown; the identity must go.
    PlayerUnknown,
}

/// Error returned when an event cannot be applied in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the machine was in when the invalid event arrived.
    pub from: Phase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Result of feeding one clock tick into the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown is not running in the current phase; nothing changed.
    Frozen,
    /// One second consumed; the remaining budget is attached.
    Counting(u32),
    /// The countdown just reached zero and the session expired.
    LocallyExpired,
}

/// State machine owning one player's progress through the hunt.
///
/// All mutation of the [`PlayerSession`] record flows through [`apply`] and
/// [`tick`], so callers that serialize those calls get the single-writer
/// guarantee for free.
///
/// [`apply`]: SessionStateMachine::apply
/// [`tick`]: SessionStateMachine::tick
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: Phase,
    session: PlayerSession,
}

impl SessionStateMachine {
    /// Create a machine in the bootstrapping phase with a fresh record.
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            phase: Phase::Bootstrapping,
            session: PlayerSession::new(player_id),
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Read access to the player record.
    pub fn session(&self) -> &PlayerSession {
        &self.session
    }

    /// Take the player record out of the machine at teardown.
    pub fn into_session(self) -> PlayerSession {
        self.session
    }

    /// Seed the displayed hint without a transition (bootstrap only path).
    pub fn seed_hint(&mut self, hint: Hint) {
        self.session.hint = Some(hint);
    }

    /// Apply an event, returning the phase it moved the machine to.
    ///
    /// Terminal phases reject every event, which keeps completion and
    /// expiry idempotent no matter how late a duplicate signal arrives.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Phase, InvalidTransition> {
        let next = match (self.phase, event) {
            (
                Phase::Bootstrapping,
                SessionEvent::BootstrapLoaded {
                    current_level,
                    time_left,
                },
            ) => {
                self.session.current_level = current_level;
                self.session.time_left_seconds = time_left;
                Phase::InProgress
            }
            (Phase::Bootstrapping, SessionEvent::BootstrapCompleted { completion_time }) => {
                self.session.record_completion(completion_time);
                Phase::Completed
            }
            (Phase::InProgress, SessionEvent::ScanAdmitted) => Phase::AwaitingResult,
            (Phase::AwaitingResult, SessionEvent::HintRevealed { hint }) => {
                self.session.current_level += 1;
                self.session.hint = Some(hint);
                self.session.notice = None;
                Phase::InProgress
            }
            (Phase::AwaitingResult, SessionEvent::GameCompleted { completion_time }) => {
                self.session.record_completion(completion_time);
                Phase::Completed
            }
            (Phase::AwaitingResult, SessionEvent::ScanNotice { message }) => {
                self.session.notice = Some(message);
                Phase::InProgress
            }
            (Phase::AwaitingResult, SessionEvent::ScanFailed { kind }) => {
                self.session.notice = Some(kind.notice().to_owned());
                Phase::InProgress
            }
            (phase, SessionEvent::TimeExpired) if !phase.is_terminal() => {
                self.session.record_completion(0);
                Phase::Expired
            }
            (phase, SessionEvent::PlayerUnknown) if !phase.is_terminal() => Phase::Invalid,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        self.phase = next;
        Ok(next)
    }

    /// Consume one second of the local countdown.
    ///
    /// The countdown runs while in progress or awaiting a result and is
    /// frozen everywhere else. Reaching zero expires the session exactly
    /// once; the expiry records a completion time of zero, the convention
    /// for a hunt that ran out the clock.
    pub fn tick(&mut self) -> TickOutcome {
        if !matches!(self.phase, Phase::InProgress | Phase::AwaitingResult) {
            return TickOutcome::Frozen;
        }

        self.session.time_left_seconds = self.session.time_left_seconds.saturating_sub(1);
        if self.session.time_left_seconds == 0 {
            self.session.record_completion(0);
            self.phase = Phase::Expired;
            return TickOutcome::LocallyExpired;
        }

        TickOutcome::Counting(self.session.time_left_seconds)
    }
}
