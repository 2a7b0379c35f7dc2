use std::sync::Arc;

use seatwarden_core::{AttemptBudget, ReservationOutcome, ReservationRequest};
use tracing::{info, warn};

use crate::desk::Reserver;

/// Runs reservation attempts until one succeeds or the budget is spent.
pub struct RetryScheduler {
    reserver: Arc<dyn Reserver>,
}

impl RetryScheduler {
    pub fn new(reserver: Arc<dyn Reserver>) -> Self {
        Self { reserver }
    }

    /// Attempt `req` at most `budget.max_attempts` times, sleeping
    /// `inter_attempt_delay` between attempts.
    ///
    /// Errors from an attempt are logged and count as a failed attempt.
    /// Returns the first successful outcome, or the last failure.
    pub async fn run(&self, req: &ReservationRequest, budget: AttemptBudget) -> ReservationOutcome {
        let mut remaining = budget.max_attempts;
        let mut attempt: u32 = 0;
        let mut last = ReservationOutcome::failure("no reservation attempt was made");

        while remaining > 0 {
            remaining -= 1;
            attempt += 1;

            let outcome = match self.reserver.reserve(req).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(attempt, code = e.code(), "reservation attempt errored: {e}");
                    ReservationOutcome::failure(e.to_string())
                }
            };

            if outcome.success {
                info!(attempt, room_id = %req.room_id, seat_no = %req.seat_no, "seat reserved");
                return outcome;
            }

            warn!(
                attempt,
                remaining,
                reason = outcome.message.as_deref().unwrap_or("unknown"),
                "reservation failed"
            );
            last = outcome;

            if remaining > 0 {
                tokio::time::sleep(budget.inter_attempt_delay).await;
            }
        }

        last
    }
}
