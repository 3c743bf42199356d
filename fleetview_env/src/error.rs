//! Error types for the FleetView environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Routing Engine unreachable, timed out or answered with a failure status
    #[error("Routing engine unavailable: {0}")]
    RoutingUnavailable(String),

    /// Transport send failed (channel closed, hub gone, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Target connection is not (or no longer) connected
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    /// Routing Engine gave no answer within the allotted time
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates a routing-unavailable error.
    pub fn routing(msg: impl Into<String>) -> Self {
        Self::RoutingUnavailable(msg.into())
    }

    /// Creates a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates an unknown-connection error.
    pub fn unknown_connection(connection: impl std::fmt::Display) -> Self {
        Self::UnknownConnection(connection.to_string())
    }
}
