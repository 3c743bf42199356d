//! SimWorld - The simulation harness container.

use crate::client::SimClient;
use crate::context::SimContext;
use crate::routing::SimRoutingEngine;

use fleetview_core::{TrackerConfig, TrackingCoordinator};
use fleetview_env::{
    ClientRequest, ConnectionId, Coordinate, DriverId, LocalTransport, StartTracking, TrackerContext,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Coordinator wired to the simulated collaborators.
pub type SimCoordinator = TrackingCoordinator<SimContext, LocalTransport, SimRoutingEngine>;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of drivers the fleet-style scenarios use
    pub num_drivers: usize,

    /// Maximum simulation duration in seconds
    pub max_duration_secs: f64,

    /// Segments per synthetic route
    pub route_segments: usize,

    /// Virtual latency of every routing answer
    pub routing_latency: Duration,

    /// Engine configuration (tick interval, retry policy)
    pub tracker: TrackerConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_drivers: 8,
            max_duration_secs: 30.0,
            route_segments: 20,
            routing_latency: Duration::ZERO,
            tracker: TrackerConfig::default(),
        }
    }
}

/// A planned trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trip {
    pub start: Coordinate,
    pub target: Coordinate,
}

// Manhattan-ish bounding box for generated trips
const LNG_RANGE: (f64, f64) = (-74.02, -73.93);
const LAT_RANGE: (f64, f64) = (40.70, 40.80);

/// The SimWorld - container for the entire simulation.
///
/// Must be created inside the (paused) runtime that will drive it.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    /// In-process topic hub all clients connect to
    pub hub: Arc<LocalTransport>,

    /// Fault-injecting routing engine
    pub routing: Arc<SimRoutingEngine>,

    /// The engine under test
    pub coordinator: Arc<SimCoordinator>,

    /// Trip generator
    rng: ChaCha8Rng,

    /// Base of the seeded connection ids
    connection_seed: u64,
    connections: AtomicU64,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration.
    pub fn new(config: SimConfig) -> Self {
        // Derive separate seeds for different subsystems
        let context_seed = config.seed;
        let routing_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);

        let context = SimContext::shared(context_seed);
        let hub = Arc::new(LocalTransport::new());
        let routing = Arc::new(
            SimRoutingEngine::new(routing_seed)
                .with_segments(config.route_segments)
                .with_latency(config.routing_latency),
        );
        let coordinator = Arc::new(TrackingCoordinator::new(
            Arc::clone(&context),
            Arc::clone(&hub),
            Arc::clone(&routing),
            config.tracker.clone(),
        ));
        let rng = context.rng(0);
        let connection_seed = config.seed.wrapping_mul(0xbf58476d1ce4e5b9);

        Self {
            config,
            context,
            hub,
            routing,
            coordinator,
            rng,
            connection_seed,
            connections: AtomicU64::new(0),
        }
    }

    /// Tick period of the engine.
    pub fn tick(&self) -> Duration {
        self.config.tracker.tick_interval
    }

    /// Number of whole ticks that fit in the configured duration (at least one).
    pub fn ticks_in_duration(&self) -> u64 {
        let ticks = (self.config.max_duration_secs / self.tick().as_secs_f64()).floor();
        (ticks as u64).max(1)
    }

    /// Virtual seconds since the world was created.
    pub fn now_secs(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    /// Random trip inside the city bounding box.
    pub fn random_trip(&mut self) -> Trip {
        let point = |rng: &mut ChaCha8Rng| {
            Coordinate::new(rng.gen_range(LNG_RANGE.0..LNG_RANGE.1), rng.gen_range(LAT_RANGE.0..LAT_RANGE.1))
        };
        let start = point(&mut self.rng);
        let target = point(&mut self.rng);
        Trip { start, target }
    }

    /// Deterministic RNG for scenario decisions.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Registers a new client on the hub under a seed-derived id.
    pub fn connect_client(&self) -> SimClient {
        let n = self.connections.fetch_add(1, Ordering::Relaxed);
        let connection = ConnectionId::from_seed(self.connection_seed.wrapping_add(n));
        SimClient::connect_as(&self.hub, connection)
    }

    /// Closes a client connection the way a server would on socket close.
    pub async fn close_client(&self, client: &SimClient) {
        self.hub.disconnect(client.connection());
        self.coordinator.handle_connection_closed(client.connection()).await;
    }

    /// Advances virtual time by `ticks` periods plus half a period, so that
    /// exactly `ticks` broadcasts fire for a ticker armed at the current
    /// instant.
    pub async fn run_ticks(&self, ticks: u64) {
        let tick = self.tick();
        let span = self.span(ticks).saturating_add(tick / 2);
        self.context.sleep(span).await;
    }

    /// Advances virtual time by exactly `ticks` periods. Use after
    /// [`run_ticks`](Self::run_ticks), when running tickers sit half a
    /// period out of phase with the clock.
    pub async fn advance(&self, ticks: u64) {
        self.context.sleep(self.span(ticks)).await;
    }

    /// `ticks` whole periods, saturating instead of wrapping.
    fn span(&self, ticks: u64) -> Duration {
        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        self.tick().saturating_mul(ticks)
    }

    /// Builds a `start-tracking` request for `trip`.
    pub fn start_request(driver_id: &DriverId, trip: Trip) -> ClientRequest {
        ClientRequest::StartTracking(StartTracking {
            driver_id: driver_id.clone(),
            start_lat: Some(trip.start.latitude),
            start_lng: Some(trip.start.longitude),
            target_lat: Some(trip.target.latitude),
            target_lng: Some(trip.target.longitude),
        })
    }
}

/// Stable id for the `index`th simulated driver.
pub fn driver_name(index: usize) -> DriverId {
    DriverId::new(format!("driver-{:03}", index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_trips_are_seeded() {
        let mut a = SimWorld::new(SimConfig::default());
        let mut b = SimWorld::new(SimConfig::default());
        let mut c = SimWorld::new(SimConfig {
            seed: 7,
            ..SimConfig::default()
        });

        let trip = a.random_trip();
        assert_eq!(trip, b.random_trip());
        assert_ne!(trip, c.random_trip());
        assert!(trip.start.longitude >= LNG_RANGE.0 && trip.start.longitude < LNG_RANGE.1);
        assert!(trip.target.latitude >= LAT_RANGE.0 && trip.target.latitude < LAT_RANGE.1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_ids_are_seeded() {
        let a = SimWorld::new(SimConfig::default());
        let b = SimWorld::new(SimConfig::default());
        let c = SimWorld::new(SimConfig {
            seed: 7,
            ..SimConfig::default()
        });

        let first = a.connect_client().connection();
        let second = a.connect_client().connection();
        assert_ne!(first, second);
        assert_eq!(first, b.connect_client().connection());
        assert_ne!(first, c.connect_client().connection());
        assert_eq!(a.hub.connection_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_advances_virtual_clock() {
        let world = SimWorld::new(SimConfig::default());
        world.run_ticks(3).await;
        assert!((world.now_secs() - 3.5).abs() < 1e-9);
        assert_eq!(world.ticks_in_duration(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_span_does_not_wrap() {
        let world = SimWorld::new(SimConfig::default());
        let big = u64::from(u32::MAX) + 2;
        assert!(world.span(big) >= world.span(u64::from(u32::MAX)));
        assert_eq!(world.span(3), Duration::from_secs(3));
    }

    #[test]
    fn test_driver_names_sort_by_index() {
        assert!(driver_name(2) < driver_name(10));
        assert_eq!(driver_name(7).as_str(), "driver-007");
    }
}
