use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The daily fire time is not a valid `HH:MM:SS` value.
    #[error("Invalid fire time: {0}")]
    InvalidTime(String),
}

impl CoreError {
    /// Short error code string used in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "CONFIG_ERROR",
            CoreError::InvalidTime(_) => "INVALID_TIME",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
