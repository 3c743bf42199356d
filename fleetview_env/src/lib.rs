//! FleetView Environment Abstraction Layer
//!
//! This crate provides the seams between the tracking engine and the
//! outside world, so the same engine runs in **Production** (tokio, OSRM
//! over HTTP) and in the **Simulation** harness (paused clock, scripted
//! routing, in-process clients).
//!
//! # Collaborators
//!
//! - Runtime: `now()`, `sleep()`, `spawn()` via [`TrackerContext`]
//! - Routing Engine: origin/destination to waypoint path via [`RoutingEngine`]
//! - Real-time Transport: topic publish and per-connection replies via
//!   [`RealtimeTransport`]
//!
//! # Example
//!
//! ```ignore
//! use fleetview_env::{TrackerContext, RealtimeTransport, Topic};
//!
//! async fn ticker<Ctx: TrackerContext, Net: RealtimeTransport>(ctx: &Ctx, net: &Net) {
//!     loop {
//!         ctx.sleep(Duration::from_secs(1)).await;
//!         net.publish(&Topic::driver(&id), location).await?;
//!     }
//! }
//! ```

mod context;
mod error;
mod local;
mod messages;
mod osrm;
mod routing;
mod tokio_impl;
mod transport;
mod types;

pub use context::TrackerContext;
pub use error::EnvError;
pub use local::LocalTransport;
pub use messages::{
    ClientRequest, DriverLocation, ErrorMessage, GeometryKind, LatLng, RouteCalculated,
    RouteGeometry, RouteRequest, ServerMessage, StartTracking, StopRequest,
};
pub use osrm::OsrmClient;
pub use routing::{RouteSummary, RoutingEngine};
pub use tokio_impl::TokioContext;
pub use transport::RealtimeTransport;
pub use types::{ConnectionId, Coordinate, DriverId, Topic};
