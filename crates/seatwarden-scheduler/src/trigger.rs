use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, NaiveTime, Utc};
use seatwarden_core::{AttemptBudget, ReservationOutcome, ReservationRequest};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    error::{Result, SchedulerError},
    retry::RetryScheduler,
    schedule::compute_next_fire,
    watchdog::CheckInWatchdog,
};

/// Fires one reservation run per day at a fixed wall-clock time.
pub struct CronTrigger {
    fire_at: NaiveTime,
    offset: FixedOffset,
    request: ReservationRequest,
    budget: AttemptBudget,
    retry: RetryScheduler,
    /// Started after every run when auto-protection is on.
    watchdog: Option<Arc<CheckInWatchdog>>,
}

impl CronTrigger {
    pub fn new(
        fire_at: NaiveTime,
        offset: FixedOffset,
        request: ReservationRequest,
        budget: AttemptBudget,
        retry: RetryScheduler,
        watchdog: Option<Arc<CheckInWatchdog>>,
    ) -> Self {
        Self {
            fire_at,
            offset,
            request,
            budget,
            retry,
            watchdog,
        }
    }

    /// Next UTC firing strictly after now.
    pub fn next_fire(&self) -> Result<chrono::DateTime<Utc>> {
        compute_next_fire(self.fire_at, self.offset, Utc::now()).ok_or_else(|| {
            SchedulerError::InvalidSchedule(format!("{} at offset {}", self.fire_at, self.offset))
        })
    }

    /// Run the reservation retry loop once, then hand off to the watchdog.
    pub async fn fire(&self) -> ReservationOutcome {
        info!(room_id = %self.request.room_id, seat_no = %self.request.seat_no, "reservation run starting");
        let outcome = self.retry.run(&self.request, self.budget).await;
        if !outcome.success {
            warn!(
                reason = outcome.message.as_deref().unwrap_or("unknown"),
                "reservation run ended without a seat"
            );
        }

        if let Some(ref watchdog) = self.watchdog {
            if let Err(e) = watchdog.enable().await {
                error!("auto-cancel watchdog could not start: {e}");
            }
        }
        outcome
    }

    /// Main loop. Sleeps until each daily slot and fires, until `shutdown`
    /// broadcasts `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            time = %self.fire_at,
            offset = %self.offset,
            room_id = %self.request.room_id,
            seat_no = %self.request.seat_no,
            "daily reservation scheduled"
        );

        let mut last_fired: Option<NaiveDate> = None;
        loop {
            let next = match self.next_fire() {
                Ok(next) => next,
                Err(e) => {
                    error!("cron trigger stopping: {e}");
                    break;
                }
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            info!(next = %next.with_timezone(&self.offset), "waiting for next slot");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    let day = next.with_timezone(&self.offset).date_naive();
                    if !claim_day(&mut last_fired, day) {
                        debug!(%day, "already fired today; skipping");
                        continue;
                    }
                    self.fire().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("cron trigger shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Record `day` as fired. `false` when it already was, so one local calendar
/// day never gets two runs even if the wall clock lags the sleep.
fn claim_day(last: &mut Option<NaiveDate>, day: NaiveDate) -> bool {
    if *last == Some(day) {
        return false;
    }
    *last = Some(day);
    true
}
