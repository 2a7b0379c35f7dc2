use seatwarden_client::ClientError;
use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The daily slot cannot be placed on the calendar.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// A probe of the library service failed.
    #[error("Service error: {0}")]
    Client(#[from] ClientError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
