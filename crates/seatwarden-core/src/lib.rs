//! `seatwarden-core`: configuration and the data model shared by every
//! seatwarden crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{CoreError, Result};
pub use types::{
    AttemptBudget, CancelOutcome, ReservationOutcome, ReservationRequest, ReservationState,
    ScriptCandidate, WatchdogConfig,
};
