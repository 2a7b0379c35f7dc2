//! `LibraryClient`: the single-session facade over the library service.
//!
//! Probes live here; reservation and cancellation are in `executor.rs` and
//! `cancel.rs`.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveTime, Timelike, Utc};
use seatwarden_core::ReservationState;
use seatwarden_sandbox::SandboxedCaller;
use tracing::debug;

use crate::{
    endpoints::Endpoints,
    error::{ClientError, Result},
    scrape,
    session::Session,
};

/// Returned by [`LibraryClient::countdown`] when the page shows no deadline.
pub const NO_DEADLINE: i64 = -1;

pub struct LibraryClient<S> {
    pub(crate) session: Arc<S>,
    pub(crate) endpoints: Endpoints,
    pub(crate) sandbox: SandboxedCaller,
    offset: FixedOffset,
}

impl<S: Session> LibraryClient<S> {
    pub fn new(
        session: Arc<S>,
        endpoints: Endpoints,
        sandbox: SandboxedCaller,
        offset: FixedOffset,
    ) -> Self {
        Self {
            session,
            endpoints,
            sandbox,
            offset,
        }
    }

    /// Nickname of the logged-in user. Fails with `AuthExpired` when the
    /// session no longer identifies anyone.
    pub async fn nickname(&self) -> Result<String> {
        let html = self.session.get(&self.endpoints.center()).await?;
        scrape::parse_nickname(&html).ok_or(ClientError::AuthExpired)
    }

    /// Current reservation state, freshly fetched.
    pub async fn status(&self) -> Result<ReservationState> {
        let html = self.session.get(&self.endpoints.reserve_index()).await?;
        let state = scrape::parse_state(&html);
        debug!(%state, "status probed");
        Ok(state)
    }

    /// Seconds left until the check-in deadline, measured now in the
    /// service's time zone. [`NO_DEADLINE`] when no deadline is shown.
    pub async fn countdown(&self) -> Result<i64> {
        let now = Utc::now().with_timezone(&self.offset).time();
        self.countdown_at(now).await
    }

    /// [`countdown`](Self::countdown) against an explicit wall-clock time.
    pub async fn countdown_at(&self, now: NaiveTime) -> Result<i64> {
        let html = self.session.get(&self.endpoints.reserve_index()).await?;
        Ok(match scrape::parse_deadline(&html) {
            Some((hour, minute)) => countdown_secs(hour, minute, now),
            None => NO_DEADLINE,
        })
    }
}

/// Remaining seconds from `now` to `hour:minute` on the same calendar day.
///
/// Not day-boundary aware: a deadline just after midnight seen from late
/// evening yields a large negative value, which callers read as "no active
/// deadline".
pub fn countdown_secs(hour: u32, minute: u32, now: NaiveTime) -> i64 {
    (i64::from(hour) - i64::from(now.hour())) * 3600
        + (i64::from(minute) - i64::from(now.minute())) * 60
        - i64::from(now.second())
}

/// Human form used in log lines, e.g. `"1 min 5 s"`.
pub fn format_countdown(secs: i64) -> String {
    format!("{} min {} s", secs / 60, secs % 60)
}
