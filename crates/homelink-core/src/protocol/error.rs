//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to a board
///
/// A byte that fails to go out or never comes back is not an error; it is
/// reported through [`super::SendOutcome`],
/// [`super::ReadOutcome`] and the link health record instead.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Port could not be opened; calling open again may succeed
    #[error("Connection failed ({port}): {reason}")]
    ConnectionFailed {
        /// Port or `tcp://` address
        port: String,
        /// OS or driver message
        reason: String,
    },

    /// Malformed port name or baud rate
    #[error("Invalid link configuration: {0}")]
    InvalidConfig(String),

    /// Setpoint outside its domain, raised before any byte is sent
    #[error("{field} must be between {min:.1} and {max:.1}, got {value:.1}")]
    Validation {
        /// Rejected setting
        field: &'static str,
        /// Requested value
        value: f64,
        /// Lowest allowed value
        min: f64,
        /// Highest allowed value
        max: f64,
    },

    /// Curtain link opened while simulation is on
    #[error("Simulation mode is active; disable it before opening the link")]
    SimulationActive,

    /// Worker thread is gone
    #[error("Poll worker has stopped")]
    WorkerStopped,

    /// Unreadable or invalid configuration file
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operating system I/O failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether re-invoking `open` may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProtocolError::ConnectionFailed { .. } | ProtocolError::IoError(_)
        )
    }
}
