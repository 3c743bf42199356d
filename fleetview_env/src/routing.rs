//! Routing Engine abstraction.

use crate::error::EnvError;
use crate::types::Coordinate;
use async_trait::async_trait;

/// Result of one route resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    /// Total route length in kilometres
    pub distance_km: f64,

    /// Estimated travel time in minutes
    pub eta_minutes: f64,

    /// Ordered waypoints from origin to destination (may be empty)
    pub path: Vec<Coordinate>,
}

/// Collaborator that turns two coordinates into a geometric path.
///
/// # Implementations
///
/// - **Production**: `OsrmClient` - HTTP request to an OSRM server
/// - **Simulation**: `SimRoutingEngine` - straight-line routes with fault injection
///
/// # Contract
///
/// * `Ok(summary)` - the engine answered successfully; `summary.path` may be
///   empty, which callers must treat as a failed resolution
/// * `Err(EnvError::RoutingUnavailable)` - unreachable, timed out or a
///   non-success status
///
/// Implementations never retry; retry policy belongs to the caller.
#[async_trait]
pub trait RoutingEngine: Send + Sync + 'static {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, EnvError>;
}
