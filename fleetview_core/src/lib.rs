//! FleetView Core - Driver Tracking Engine
//!
//! Simulates delivery drivers travelling along resolved routes and streams
//! their positions to subscribed clients:
//! 1. **Route resolution**: origin/destination to an ordered waypoint path, with bounded retry
//! 2. **Driver sessions**: per-driver traversal state advanced one waypoint per tick
//! 3. **Coordination**: at most one live ticker per driver, race-free start/stop/disconnect

pub mod config;
pub mod driver_registry;
pub mod driver_session;
pub mod error;
pub mod metrics;
pub mod route_resolver;
pub mod tracking_coordinator;
pub mod validation;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use config::{ConfigError, RetryPolicy, TrackerConfig};
pub use driver_registry::{DriverRegistry, SharedSession};
pub use driver_session::{AdvanceOutcome, DriverSession, SessionSnapshot, SessionState, TickerHandle};
pub use error::TrackingError;
pub use metrics::{EngineMetrics, TrackerStats};
pub use route_resolver::RouteResolver;
pub use tracking_coordinator::{route_calculated, TrackingCoordinator};
pub use validation::TripEndpoints;
