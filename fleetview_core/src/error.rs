//! Error kinds surfaced by the tracking engine.

use fleetview_env::{EnvError, ErrorMessage, ServerMessage};
use thiserror::Error;

/// Failures of a tracking lifecycle request.
///
/// Stop/disconnect of an unknown driver has no variant: it is a no-op.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    /// A start or target coordinate was missing or not a finite number
    #[error("Invalid target: {field} {reason}")]
    InvalidTarget {
        field: &'static str,
        reason: &'static str,
    },

    /// Routing Engine unreachable, timed out or answered with a failure status
    #[error("Routing unavailable: {0}")]
    RoutingUnavailable(String),

    /// Routing Engine answered successfully but with zero waypoints
    #[error("Routing engine returned an empty route")]
    RoutingEmptyResult,

    /// The real-time transport rejected an operation
    #[error("Transport error: {0}")]
    Transport(String),
}

impl TrackingError {
    pub fn missing(field: &'static str) -> Self {
        Self::InvalidTarget {
            field,
            reason: "was not provided",
        }
    }

    pub fn not_finite(field: &'static str) -> Self {
        Self::InvalidTarget {
            field,
            reason: "is not a finite number",
        }
    }

    /// Stable machine-readable code for the wire `error` message.
    pub fn code(&self) -> &'static str {
        match self {
            TrackingError::InvalidTarget { .. } => "INVALID_TARGET",
            TrackingError::RoutingUnavailable(_) => "ROUTING_UNAVAILABLE",
            TrackingError::RoutingEmptyResult => "ROUTING_EMPTY_RESULT",
            TrackingError::Transport(_) => "TRANSPORT_ERROR",
        }
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackingError::RoutingUnavailable(_))
    }

    /// Builds the structured error reply for the requesting connection.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error(ErrorMessage {
            code: self.code().to_string(),
            message: self.to_string(),
        })
    }
}

impl From<EnvError> for TrackingError {
    fn from(err: EnvError) -> Self {
        match err {
            EnvError::RoutingUnavailable(msg) => TrackingError::RoutingUnavailable(msg),
            EnvError::Timeout(ms) => TrackingError::RoutingUnavailable(format!("timed out after {}ms", ms)),
            other => TrackingError::Transport(other.to_string()),
        }
    }
}
