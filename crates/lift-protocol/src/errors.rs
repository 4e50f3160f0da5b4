//! Error Handling Guidelines
//!
//! All error messages should follow this format:
//!
//! 1. **What failed**: Describe the operation that failed
//! 2. **Why it failed**: Provide the root cause if known
//! 3. **What to do**: Suggest operator action when possible
//!
//! Examples:
//! - ✅ "Cannot connect to dispatcher at 10.0.0.2:4242: connection refused. Check the dispatcher is running and retry connect."
//! - ✅ "Elevator mailbox closed - the elevator actor has quit, start a new one."
//! - ❌ "Connect failed" (lacks context and action)
//! - ❌ "Error" (too vague)

use thiserror::Error;

/// Unified error type for actor operations
#[derive(Error, Debug, Clone)]
pub enum ActorError {
    /// Actor received an unexpected message in current state
    #[error("Unexpected message in state {state}: {message}")]
    UnexpectedMessage { state: String, message: String },

    /// Communication channel closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Failures specific to the elevator entity.
///
/// Only `InitialisationFailure` is fatal (it drives the elevator to quitting).
/// The rest are handled locally by a state change and a diagnostic; none of
/// them escape to crash the process and none trigger an automatic retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElevatorError {
    /// Resolve or connect attempt did not succeed
    #[error("Cannot connect to dispatcher at {host}:{port}: {reason}. Send connect again to retry.")]
    ConnectionFailure {
        host: String,
        port: u16,
        reason: String,
    },

    /// Established dispatcher link went down
    #[error("Lost connection to dispatcher: {0}. Please reconnect or quit.")]
    ConnectionLost(String),

    /// Requested floor is outside the configured bounds
    #[error("Waypoint floor {floor} outside [{min}, {max}]")]
    InvalidWaypoint { floor: i32, min: i32, max: i32 },

    /// One-time setup failed
    #[error("Elevator initialisation failed: {0}")]
    InitialisationFailure(String),
}

impl ElevatorError {
    /// Whether this error ends the elevator's lifecycle
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InitialisationFailure(_))
    }
}
