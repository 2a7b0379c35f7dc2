//! `CheckInWatchdog`: polls the check-in countdown of a held seat and gives
//! the seat back before the deadline lapses.
//!
//! At most one polling timer exists per watchdog. Its presence is the
//! watchdog's state: the slot is read and written only under one mutex, so
//! start, stop and self-termination never interleave.

use std::sync::Arc;

use seatwarden_client::format_countdown;
use seatwarden_core::{ReservationState, WatchdogConfig};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::desk::CheckInDesk;
use crate::error::Result;

/// Whether a polling timer is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Inactive,
    Active,
}

/// What one poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Nothing to do yet.
    Waiting,
    /// The threshold was crossed and a cancellation was issued.
    CancelIssued,
    /// The deadline is gone and the seat is no longer held; stop polling.
    Finished,
}

struct ActiveTimer {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct CheckInWatchdog {
    desk: Arc<dyn CheckInDesk>,
    config: WatchdogConfig,
    timer: Mutex<Option<ActiveTimer>>,
}

impl CheckInWatchdog {
    pub fn new(desk: Arc<dyn CheckInDesk>, config: WatchdogConfig) -> Self {
        Self {
            desk,
            config,
            timer: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> WatchdogState {
        let timer = self.timer.lock().await;
        state_of(timer.as_ref())
    }

    /// Start polling if the seat is currently held.
    ///
    /// A no-op while a timer is already running. Stays `Inactive` when the
    /// probed state is anything but `Reserved`.
    pub async fn enable(&self) -> Result<WatchdogState> {
        let mut timer = self.timer.lock().await;
        if state_of(timer.as_ref()) == WatchdogState::Active {
            debug!("watchdog already active");
            return Ok(WatchdogState::Active);
        }

        let state = self.desk.status().await?;
        if state != ReservationState::Reserved {
            info!(%state, "not waiting for check-in; auto-cancel not started");
            *timer = None;
            return Ok(WatchdogState::Inactive);
        }

        let stop = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.desk),
            self.config,
            stop.clone(),
        ));
        *timer = Some(ActiveTimer { stop, handle });
        info!(
            threshold_secs = self.config.threshold_secs,
            poll_secs = self.config.poll_interval.as_secs(),
            "auto-cancel watchdog started"
        );
        Ok(WatchdogState::Active)
    }

    /// Stop polling. Idempotent.
    ///
    /// A tick already in flight runs to completion; no further tick fires.
    pub async fn disable(&self) {
        let mut timer = self.timer.lock().await;
        if let Some(active) = timer.take() {
            active.stop.cancel();
            if !active.handle.is_finished() {
                info!("auto-cancel watchdog stopped");
            }
        }
    }
}

fn state_of(timer: Option<&ActiveTimer>) -> WatchdogState {
    match timer {
        Some(t) if !t.handle.is_finished() => WatchdogState::Active,
        _ => WatchdogState::Inactive,
    }
}

async fn poll_loop(desk: Arc<dyn CheckInDesk>, config: WatchdogConfig, stop: CancellationToken) {
    // First poll one interval after start.
    let mut ticker = interval_at(Instant::now() + config.poll_interval, config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if tick(desk.as_ref(), config.threshold_secs).await == TickAction::Finished {
            info!("no longer waiting for check-in; auto-cancel watchdog finished");
            break;
        }
    }
}

/// Run one poll against `desk`.
///
/// Cancels when `0 < countdown <= threshold_secs`. Reports `Finished` when
/// the countdown is negative and the seat is no longer held. Probe and
/// cancellation failures are logged and never end the watchdog.
pub async fn tick(desk: &dyn CheckInDesk, threshold_secs: i64) -> TickAction {
    let countdown = match desk.countdown().await {
        Ok(cd) => cd,
        Err(e) => {
            error!(code = e.code(), "countdown probe failed: {e}");
            return TickAction::Waiting;
        }
    };

    if countdown > 0 {
        info!(countdown_secs = countdown, "check in within {}", format_countdown(countdown));
    }

    if countdown > 0 && countdown <= threshold_secs {
        warn!(countdown_secs = countdown, "protection threshold reached; cancelling reservation");
        match desk.cancel().await {
            Ok(outcome) if outcome.success => info!("reservation cancelled"),
            Ok(outcome) => warn!(
                reason = outcome.message.as_deref().unwrap_or("state still not idle"),
                "cancellation did not take effect"
            ),
            Err(e) => error!(code = e.code(), "cancellation failed: {e}"),
        }
        return TickAction::CancelIssued;
    }

    if countdown < 0 {
        match desk.status().await {
            Ok(ReservationState::Reserved) => {}
            Ok(_) => return TickAction::Finished,
            Err(e) => error!(code = e.code(), "status probe failed: {e}"),
        }
    }

    TickAction::Waiting
}
