//! Classification of backend failures into recovery actions.
//!
//! The session state machine never observes raw transport errors: every
//! failure crosses this boundary first and arrives as a [`GameErrorKind`].

use reqwest::StatusCode;

use crate::api::error::ApiError;

/// Recovery category for a failed backend interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameErrorKind {
    /// The backend does not know this player; the session is unrecoverable
    /// and the stored identity must be discarded.
    PlayerNotFound,
    /// The scanned code is not the one expected for the target level.
    WrongCode,
    /// The backend's own accounting says the time budget is exhausted.
    TimeExpired,
    /// The backend's scan cooldown rejected the attempt.
    RateLimited,
    /// Anything else, including transport failures with no response.
    Unknown,
}

impl GameErrorKind {
    /// Fixed user-facing message for this failure.
    pub fn notice(self) -> &'static str {
        match self {
            GameErrorKind::PlayerNotFound => "Player not found. Please register again.",
            GameErrorKind::WrongCode => "Wrong QR code. Try again.",
            GameErrorKind::TimeExpired => "Game time is up!",
            GameErrorKind::RateLimited => "Scanning too quickly. Wait a moment and try again.",
            GameErrorKind::Unknown => "Scan failed. Please try again.",
        }
    }

    /// Fatal kinds end the session; everything else keeps it alive.
    pub fn is_fatal(self) -> bool {
        matches!(self, GameErrorKind::PlayerNotFound | GameErrorKind::TimeExpired)
    }
}

/// Map a transport failure onto a recovery action.
///
/// Failures with no response at all (connect errors, timeouts, undecodable
/// bodies) are [`GameErrorKind::Unknown`] and therefore recoverable: the
/// player simply scans again.
pub fn classify(error: &ApiError) -> GameErrorKind {
    match error {
        ApiError::Status {
            status,
            detail,
            error_kind,
            ..
        } => classify_status(*status, detail.as_deref(), error_kind.as_deref()),
        _ => GameErrorKind::Unknown,
    }
}

/// Classify from the response status plus the failure body.
///
/// A structured `error_kind` field wins when present. The fallback is the
/// legacy convention, where HTTP 400 carries two distinct meanings and one
/// backend variant answered 405 for bad codes, disambiguated only by the
/// free-text `detail`.
fn classify_status(status: StatusCode, detail: Option<&str>, kind: Option<&str>) -> GameErrorKind {
    if let Some(kind) = kind.and_then(kind_from_field) {
        return kind;
    }

    match status.as_u16() {
        404 => GameErrorKind::PlayerNotFound,
        429 => GameErrorKind::RateLimited,
        400 | 405 => classify_detail(detail),
        _ => GameErrorKind::Unknown,
    }
}

fn classify_detail(detail: Option<&str>) -> GameErrorKind {
    let Some(detail) = detail else {
        return GameErrorKind::Unknown;
    };

    let detail = detail.to_ascii_lowercase();
    if detail.contains("time is up") {
        GameErrorKind::TimeExpired
    } else if detail.contains("wrong") || detail.contains("incorrect") {
        GameErrorKind::WrongCode
    } else {
        GameErrorKind::Unknown
    }
}

fn kind_from_field(value: &str) -> Option<GameErrorKind> {
    match value {
        "player_not_found" => Some(GameErrorKind::PlayerNotFound),
        "wrong_code" => Some(GameErrorKind::WrongCode),
        "time_expired" => Some(GameErrorKind::TimeExpired),
        "rate_limited" => Some(GameErrorKind::RateLimited),
        _ => None,
    }
}
