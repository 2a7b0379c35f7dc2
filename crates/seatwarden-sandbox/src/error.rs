//! Error types for the seatwarden-sandbox crate.

use thiserror::Error;

/// All errors that can originate from sandboxed script execution.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Script execution exceeded its wall-clock budget.
    #[error("Script timed out after {ms}ms")]
    ScriptTimeout { ms: u64 },

    /// The named global is missing or not callable after the script ran.
    #[error("Function not found in script: {name}")]
    FunctionNotFound { name: String },

    /// The script threw, failed to parse, or the engine could not be set up.
    #[error("Script engine error: {0}")]
    Engine(String),

    /// The function returned without ever calling the bridge.
    #[error("Script finished without issuing a bridge call")]
    NoBridgeCall,

    /// The blocking worker running the engine panicked or was cancelled.
    #[error("Sandbox worker failed: {0}")]
    Worker(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SandboxError>;
