//! The seams the scheduler drives. [`LibraryClient`] implements both.

use async_trait::async_trait;
use seatwarden_client::{ClientError, LibraryClient, Session};
use seatwarden_core::{CancelOutcome, ReservationOutcome, ReservationRequest, ReservationState};

/// Makes one reservation attempt.
#[async_trait]
pub trait Reserver: Send + Sync {
    async fn reserve(&self, req: &ReservationRequest) -> Result<ReservationOutcome, ClientError>;
}

/// What the check-in watchdog needs from the service.
#[async_trait]
pub trait CheckInDesk: Send + Sync {
    async fn status(&self) -> Result<ReservationState, ClientError>;

    /// Seconds until the check-in deadline; negative when there is none.
    async fn countdown(&self) -> Result<i64, ClientError>;

    async fn cancel(&self) -> Result<CancelOutcome, ClientError>;
}

#[async_trait]
impl<S: Session + 'static> Reserver for LibraryClient<S> {
    async fn reserve(&self, req: &ReservationRequest) -> Result<ReservationOutcome, ClientError> {
        LibraryClient::reserve(self, req).await
    }
}

#[async_trait]
impl<S: Session + 'static> CheckInDesk for LibraryClient<S> {
    async fn status(&self) -> Result<ReservationState, ClientError> {
        LibraryClient::status(self).await
    }

    async fn countdown(&self) -> Result<i64, ClientError> {
        LibraryClient::countdown(self).await
    }

    async fn cancel(&self) -> Result<CancelOutcome, ClientError> {
        LibraryClient::cancel(self).await
    }
}
