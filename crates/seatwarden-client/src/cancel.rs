use seatwarden_core::{CancelOutcome, ReservationOutcome, ReservationState};
use tracing::{info, warn};

use crate::{
    client::LibraryClient,
    error::{ClientError, Result},
    session::Session,
};

impl<S: Session> LibraryClient<S> {
    /// Give the held seat back.
    ///
    /// Requests a cancellation token, exchanges it, then re-probes. Succeeds
    /// only when the state afterwards is `Idle`.
    pub async fn cancel(&self) -> Result<CancelOutcome> {
        let body = self
            .session
            .post(&self.endpoints.cancel_token(), "type=cancle")
            .await?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ClientError::CancellationFailure(format!("unreadable token response: {e}")))?;

        let token = ReservationOutcome::from_response(json);
        if !token.success {
            warn!(msg = ?token.message, "cancel token refused");
            return Ok(CancelOutcome {
                success: false,
                message: token.message,
            });
        }
        let token = token
            .message
            .ok_or_else(|| ClientError::CancellationFailure("token response carried no token".to_string()))?;

        self.session
            .get(&self.endpoints.cancel_confirm(&token))
            .await?;

        let state = self.status().await?;
        info!(%state, "state after cancellation");
        Ok(CancelOutcome {
            success: state == ReservationState::Idle,
            message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::FixedOffset;
    use seatwarden_sandbox::SandboxedCaller;

    use super::*;
    use crate::endpoints::Endpoints;
    use crate::fake::FakeSession;

    const BASE: &str = "https://svc.test";

    fn client(session: FakeSession) -> LibraryClient<FakeSession> {
        LibraryClient::new(
            Arc::new(session),
            Endpoints::new(BASE),
            SandboxedCaller::new(Duration::from_millis(1000)),
            FixedOffset::east_opt(8 * 3600).unwrap(),
        )
    }

    #[tokio::test]
    async fn cancel_succeeds_when_idle_afterwards() {
        let session = FakeSession::default()
            .route(format!("{BASE}/index.php/reserve/token.html"), r#"{"code":0,"msg":"tok42"}"#)
            .route(format!("{BASE}/index.php/cancle/index?t=tok42"), "ok")
            .route(format!("{BASE}/index.php/reserve/index.html"), "<html>idle</html>");
        let outcome = client(session).cancel().await.unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn cancel_fails_when_still_reserved() {
        let session = FakeSession::default()
            .route(format!("{BASE}/index.php/reserve/token.html"), r#"{"code":0,"msg":"tok"}"#)
            .route(format!("{BASE}/index.php/cancle/index?t=tok"), "ok")
            .route(
                format!("{BASE}/index.php/reserve/index.html"),
                "请在 07:30 前到馆签到",
            );
        let outcome = client(session).cancel().await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn unreadable_token_is_cancellation_failure() {
        let session = FakeSession::default()
            .route(format!("{BASE}/index.php/reserve/token.html"), "<html>busy</html>");
        let err = client(session).cancel().await.unwrap_err();
        assert!(matches!(err, ClientError::CancellationFailure(_)));
        assert_eq!(err.code(), "CANCELLATION_FAILURE");
    }

    #[tokio::test]
    async fn accepted_token_without_value_is_cancellation_failure() {
        let session = FakeSession::default()
            .route(format!("{BASE}/index.php/reserve/token.html"), r#"{"code":0}"#);
        let err = client(session).cancel().await.unwrap_err();
        assert!(matches!(err, ClientError::CancellationFailure(_)));
    }

    #[tokio::test]
    async fn refused_token_reports_message() {
        let session = FakeSession::default().route(
            format!("{BASE}/index.php/reserve/token.html"),
            r#"{"code":1,"msg":"nothing to cancel"}"#,
        );
        let session = Arc::new(session);
        let client = LibraryClient::new(
            Arc::clone(&session),
            Endpoints::new(BASE),
            SandboxedCaller::new(Duration::from_millis(1000)),
            FixedOffset::east_opt(8 * 3600).unwrap(),
        );
        let outcome = client.cancel().await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("nothing to cancel"));
        assert_eq!(session.calls().len(), 1);
    }
}
