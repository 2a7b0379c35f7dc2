use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome message when the room id has no seat layout.
pub const MSG_NO_SUCH_VENUE: &str = "no such venue";
/// Outcome message when the seat number is absent from the room's layout.
pub const MSG_NO_SUCH_SEAT: &str = "no such seat";
/// Outcome message when none of the room's scripts carries the reservation call.
pub const MSG_FUNCTION_NOT_FOUND: &str =
    "reservation function not found — venue likely not open yet";

/// Textual markers a script must contain to be treated as the reservation
/// implementation. Matched as case-sensitive substrings.
pub const RESERVE_SCRIPT_MARKERS: [&str; 2] = ["reserve_seat", "T.ajax_get"];

/// Reservation state as observed on the service's reservation page.
///
/// Always derived from a fresh fetch; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationState {
    /// No active reservation.
    Idle,
    /// A seat is held and waiting for check-in.
    Reserved,
    /// Checked in.
    Studying,
}

impl std::fmt::Display for ReservationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReservationState::Idle => "idle",
            ReservationState::Reserved => "reserved",
            ReservationState::Studying => "studying",
        };
        write!(f, "{s}")
    }
}

/// Which seat to reserve. The seat number is resolved to the service's seat id
/// on every attempt because the id may rotate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub room_id: String,
    pub seat_no: String,
}

impl ReservationRequest {
    pub fn new(room_id: impl Into<String>, seat_no: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            seat_no: seat_no.into(),
        }
    }
}

/// Result of one reservation attempt. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationOutcome {
    pub success: bool,
    pub message: Option<String>,
    /// Raw JSON body returned by the service, when the call reached it.
    pub raw: Option<serde_json::Value>,
}

impl ReservationOutcome {
    /// A failed outcome carrying only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            raw: None,
        }
    }

    /// Normalise a service response body: `success = (code == 0)`, `message = msg`.
    ///
    /// `code` is accepted both as a number and as a numeric string.
    pub fn from_response(body: serde_json::Value) -> Self {
        let success = match body.get("code") {
            Some(serde_json::Value::Number(n)) => n.as_i64() == Some(0),
            Some(serde_json::Value::String(s)) => s.trim() == "0",
            _ => false,
        };
        let message = match body.get("msg") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        Self {
            success,
            message,
            raw: Some(body),
        }
    }
}

/// Result of a cancellation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub success: bool,
    pub message: Option<String>,
}

/// Bounded retry budget for one scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptBudget {
    pub max_attempts: u32,
    pub inter_attempt_delay: Duration,
}

impl Default for AttemptBudget {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            inter_attempt_delay: Duration::from_millis(200),
        }
    }
}

/// Auto-cancel protection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Cancel once the remaining check-in time drops to this many seconds.
    pub threshold_secs: i64,
    pub poll_interval: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            threshold_secs: 120,
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// A script referenced by a room's layout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCandidate {
    pub url: String,
    pub content: String,
}

impl ScriptCandidate {
    /// True when the content carries every reservation marker.
    pub fn is_reservation_script(&self) -> bool {
        RESERVE_SCRIPT_MARKERS
            .iter()
            .all(|marker| self.content.contains(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_numeric_zero_code() {
        let out = ReservationOutcome::from_response(serde_json::json!({"code": 0, "msg": "ok"}));
        assert!(out.success);
        assert_eq!(out.message.as_deref(), Some("ok"));
        assert!(out.raw.is_some());
    }

    #[test]
    fn outcome_from_string_code() {
        let out = ReservationOutcome::from_response(serde_json::json!({"code": "0"}));
        assert!(out.success);
        assert_eq!(out.message, None);
    }

    #[test]
    fn outcome_from_non_zero_code() {
        let out =
            ReservationOutcome::from_response(serde_json::json!({"code": 1, "msg": "seat taken"}));
        assert!(!out.success);
        assert_eq!(out.message.as_deref(), Some("seat taken"));
    }

    #[test]
    fn outcome_without_code_is_failure() {
        let out = ReservationOutcome::from_response(serde_json::json!({"msg": 42}));
        assert!(!out.success);
        assert_eq!(out.message.as_deref(), Some("42"));
    }

    #[test]
    fn markers_are_case_sensitive() {
        let both = ScriptCandidate {
            url: "https://x/a.js".into(),
            content: "function reserve_seat(){ T.ajax_get(u) }".into(),
        };
        let upper = ScriptCandidate {
            url: "https://x/b.js".into(),
            content: "function RESERVE_SEAT(){ T.ajax_get(u) }".into(),
        };
        let one = ScriptCandidate {
            url: "https://x/c.js".into(),
            content: "function reserve_seat(){}".into(),
        };
        assert!(both.is_reservation_script());
        assert!(!upper.is_reservation_script());
        assert!(!one.is_reservation_script());
    }

    #[test]
    fn default_budget_matches_daily_run() {
        let budget = AttemptBudget::default();
        assert_eq!(budget.max_attempts, 10);
        assert_eq!(budget.inter_attempt_delay, Duration::from_millis(200));
    }
}
