//! `seatwarden-scheduler`: Tokio-based reservation scheduling.
//!
//! # Overview
//!
//! [`trigger::CronTrigger`] sleeps until a daily wall-clock slot in the
//! service's time zone and runs [`retry::RetryScheduler`], which makes a
//! bounded number of evenly spaced reservation attempts. Afterwards the
//! [`watchdog::CheckInWatchdog`] may take over: it polls the check-in
//! countdown and cancels the reservation before the deadline lapses.
//!
//! | Component          | Stops when                                         |
//! |--------------------|----------------------------------------------------|
//! | `CronTrigger`      | shutdown signal is sent or its sender is dropped   |
//! | `RetryScheduler`   | first success, or the attempt budget is spent      |
//! | `CheckInWatchdog`  | `disable()`, or deadline past and seat not held    |

pub mod desk;
pub mod error;
pub mod retry;
pub mod schedule;
pub mod trigger;
pub mod watchdog;

pub use desk::{CheckInDesk, Reserver};
pub use error::{Result, SchedulerError};
pub use retry::RetryScheduler;
pub use schedule::compute_next_fire;
pub use trigger::CronTrigger;
pub use watchdog::{CheckInWatchdog, TickAction, WatchdogState};
