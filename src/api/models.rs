//! Wire shapes of the backend contract, as observed in production.

use serde::{Deserialize, Serialize};

use crate::session::player::Hint;

/// Message the backend sends alongside the final completion time.
pub const COMPLETED_MESSAGE: &str = "game completed";

/// Payload for `POST /api/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// First name of the player.
    pub name: String,
    /// Family name of the player.
    pub family_name: String,
}

/// Identity issued by the backend after registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    /// Opaque player identity; valid for the credential lifetime.
    pub player_id: String,
    /// Initial time budget in seconds.
    #[serde(default)]
    pub time_left: Option<u32>,
}

/// Authoritative session snapshot from `GET /api/player-state`.
///
/// All fields are optional on the wire: an expired player gets a bare
/// `message` body after the backend has already discarded the record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerStateResponse {
    /// Remaining budget in seconds by the backend's accounting.
    #[serde(default)]
    pub time_left: Option<u32>,
    /// Level the player has reached.
    #[serde(default)]
    pub current_level: Option<u32>,
    /// Set once the game finished; the reload-after-completion signal.
    #[serde(default)]
    pub completion_time: Option<u32>,
    /// Informational message, seen with the time fields absent.
    #[serde(default)]
    pub message: Option<String>,
}

/// One entry of `GET /api/hints`, indexed by level.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HintEntry {
    /// Riddle text for the level.
    pub text: String,
    /// Optional supplementary background text.
    #[serde(default)]
    pub educational_text: Option<String>,
}

impl From<HintEntry> for Hint {
    fn from(entry: HintEntry) -> Self {
        Hint {
            text: entry.text,
            educational_text: entry.educational_text,
        }
    }
}

/// Payload for `POST /api/scan`.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRequest {
    /// Identity of the submitting player.
    pub player_id: String,
    /// Decoded code and the level it tries to unlock.
    pub qr_code: QrCodePayload,
    /// When set, the backend skips code validation.
    pub debug: bool,
}

/// Code/level pair inside a scan submission.
#[derive(Debug, Clone, Serialize)]
pub struct QrCodePayload {
    /// Decoded text exactly as produced by the decoder.
    pub code: String,
    /// Level this code is expected to unlock.
    pub level: u32,
}

/// Success body of `POST /api/scan`; one of three observed shapes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanResponse {
    /// Present for completion and informational responses.
    #[serde(default)]
    pub message: Option<String>,
    /// Server-accounted completion time, paired with the completion message.
    #[serde(default)]
    pub completion_time: Option<u32>,
    /// Next hint text after a confirmed correct scan.
    #[serde(default)]
    pub hint: Option<String>,
    /// Supplementary text accompanying `hint`.
    #[serde(default)]
    pub educational_text: Option<String>,
}

/// Interpreted result of a successful scan submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Final code scanned; the server settled the elapsed time.
    Completed {
        /// Server-accounted completion time in seconds.
        completion_time: u32,
    },
    /// Correct code; the next hint to display.
    NextHint(Hint),
    /// Informational message without progression.
    Notice(String),
}

impl ScanResponse {
    /// Collapse the observed success shapes into one outcome.
    pub fn into_outcome(self) -> ScanOutcome {
        match self {
            ScanResponse {
                message: Some(message),
                completion_time: Some(completion_time),
                ..
            } if message == COMPLETED_MESSAGE => ScanOutcome::Completed { completion_time },
            ScanResponse {
                hint: Some(text),
                educational_text,
                ..
            } => ScanOutcome::NextHint(Hint {
                text,
                educational_text,
            }),
            ScanResponse { message, .. } => ScanOutcome::Notice(message.unwrap_or_default()),
        }
    }
}

/// Leaderboard standing for one player.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardEntry {
    /// Identity of the ranked player.
    pub player_id: String,
    /// First name as registered.
    pub name: String,
    /// Family name as registered.
    pub family_name: String,
    /// Completion time in seconds; the sort key.
    pub completion_time: u32,
    /// Position in the overall ranking, starting at 1.
    #[serde(default)]
    pub rank: Option<u32>,
}

/// Body of `GET /api/results/{player_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsResponse {
    /// Top standings, best completion time first.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// The requesting player's own standing.
    pub current_player: LeaderboardEntry,
}

/// Failure body shape shared by all endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// Free-text failure description.
    #[serde(default)]
    pub detail: Option<String>,
    /// Structured failure kind, when the backend provides one.
    #[serde(default)]
    pub error_kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_shape_wins_over_hint() {
        let response: ScanResponse = serde_json::from_str(
            r#"{"message": "game completed", "completion_time": 1200}"#,
        )
        .unwrap();
        assert_eq!(
            response.into_outcome(),
            ScanOutcome::Completed {
                completion_time: 1200
            }
        );
    }

    #[test]
    fn hint_shape_carries_educational_text() {
        let response: ScanResponse = serde_json::from_str(
            r#"{"hint": "under the old oak", "educational_text": "oaks can live 1000 years"}"#,
        )
        .unwrap();
        match response.into_outcome() {
            ScanOutcome::NextHint(hint) => {
                assert_eq!(hint.text, "under the old oak");
                assert_eq!(
                    hint.educational_text.as_deref(),
                    Some("oaks can live 1000 years")
                );
            }
            other => panic!("expected a hint, got {other:?}"),
        }
    }

    #[test]
    fn bare_message_is_a_notice() {
        let response: ScanResponse =
            serde_json::from_str(r#"{"message": "already at this level"}"#).unwrap();
        assert_eq!(
            response.into_outcome(),
            ScanOutcome::Notice("already at this level".into())
        );
    }

    #[test]
    fn player_state_tolerates_missing_fields() {
        let state: PlayerStateResponse =
            serde_json::from_str(r#"{"message": "Game time expired"}"#).unwrap();
        assert_eq!(state.time_left, None);
        assert_eq!(state.completion_time, None);
        assert_eq!(state.message.as_deref(), Some("Game time expired"));
    }

    #[test]
    fn hint_entries_ignore_unknown_fields() {
        // The backend leaks the full hint records, next code included; the
        // client only keeps the display fields.
        let entry: HintEntry = serde_json::from_str(
            r#"{"level": 1, "text": "go north", "educational_text": "", "next_qr_code": "secret"}"#,
        )
        .unwrap();
        assert_eq!(entry.text, "go north");
    }
}
