use seatwarden_core::types::{
    ReservationOutcome, MSG_FUNCTION_NOT_FOUND, MSG_NO_SUCH_SEAT, MSG_NO_SUCH_VENUE,
};
use seatwarden_sandbox::SandboxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The session cookie no longer identifies a user.
    #[error("Session expired: no nickname on the profile page")]
    AuthExpired,

    #[error("Venue not found: {room_id}")]
    VenueNotFound { room_id: String },

    #[error("Seat not found: {seat_no}")]
    SeatNotFound { seat_no: String },

    /// No referenced script exports the reservation call (venue not open yet).
    #[error("Reservation function not found")]
    ReservationFunctionNotFound,

    #[error("Reservation script timed out after {ms}ms")]
    ScriptTimeout { ms: u64 },

    #[error("Sandbox error: {0}")]
    Sandbox(SandboxError),

    /// Network failure or request timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Cancellation failed: {0}")]
    CancellationFailure(String),
}

impl From<SandboxError> for ClientError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::ScriptTimeout { ms } => ClientError::ScriptTimeout { ms },
            SandboxError::FunctionNotFound { .. } => ClientError::ReservationFunctionNotFound,
            other => ClientError::Sandbox(other),
        }
    }
}

impl ClientError {
    /// Short error code string used in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::AuthExpired => "AUTH_EXPIRED",
            ClientError::VenueNotFound { .. } => "VENUE_NOT_FOUND",
            ClientError::SeatNotFound { .. } => "SEAT_NOT_FOUND",
            ClientError::ReservationFunctionNotFound => "RESERVATION_FUNCTION_NOT_FOUND",
            ClientError::ScriptTimeout { .. } => "SCRIPT_TIMEOUT",
            ClientError::Sandbox(_) => "SANDBOX_ERROR",
            ClientError::Http(_) | ClientError::HttpStatus { .. } => "HTTP_FAILURE",
            ClientError::Parse(_) => "PARSE_ERROR",
            ClientError::CancellationFailure(_) => "CANCELLATION_FAILURE",
        }
    }

    /// Errors that end a single attempt with a failed outcome instead of
    /// propagating. The next attempt may still succeed once the venue opens.
    pub fn as_attempt_outcome(&self) -> Option<ReservationOutcome> {
        let msg = match self {
            ClientError::VenueNotFound { .. } => MSG_NO_SUCH_VENUE,
            ClientError::SeatNotFound { .. } => MSG_NO_SUCH_SEAT,
            ClientError::ReservationFunctionNotFound => MSG_FUNCTION_NOT_FOUND,
            _ => return None,
        };
        Some(ReservationOutcome::failure(msg))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_timeout_keeps_its_own_variant() {
        let err = ClientError::from(SandboxError::ScriptTimeout { ms: 500 });
        assert!(matches!(err, ClientError::ScriptTimeout { ms: 500 }));
        assert_eq!(err.code(), "SCRIPT_TIMEOUT");
    }

    #[test]
    fn missing_function_becomes_failed_outcome() {
        let err = ClientError::from(SandboxError::FunctionNotFound {
            name: "reserve_seat".to_string(),
        });
        let outcome = err.as_attempt_outcome().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some(MSG_FUNCTION_NOT_FOUND));
    }

    #[test]
    fn transport_errors_propagate() {
        let err = ClientError::HttpStatus {
            status: 502,
            url: "https://svc.test".to_string(),
        };
        assert_eq!(err.code(), "HTTP_FAILURE");
        assert!(err.as_attempt_outcome().is_none());
    }
}
