//! Simulated routing engine with fault injection.

use async_trait::async_trait;
use fleetview_env::{Coordinate, EnvError, RouteSummary, RoutingEngine};
use geo::{HaversineDistance, HaversineIntermediate, Point};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Segments per synthetic route (waypoints = segments + 1)
pub const DEFAULT_SEGMENTS: usize = 50;

/// Average speed used for ETA estimates
pub const AVERAGE_SPEED_KMH: f64 = 30.0;

/// How the simulated engine misbehaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoutingFault {
    /// Every request succeeds
    Healthy,

    /// Every request fails as unreachable
    Outage,

    /// Requests succeed with no route
    EmptyRoutes,

    /// Each request fails with the given probability (seeded)
    Flaky { failure_rate: f64 },
}

/// Great-circle routing engine for simulations.
///
/// Produces a straight route from origin to destination sampled into evenly
/// spaced waypoints, the first being the origin and the last the destination.
pub struct SimRoutingEngine {
    segments: usize,
    latency: Duration,
    fault: Mutex<RoutingFault>,
    rng: Mutex<ChaCha8Rng>,
    calls: AtomicU64,
}

impl SimRoutingEngine {
    /// Creates a healthy engine seeded for flaky-mode draws.
    pub fn new(seed: u64) -> Self {
        Self {
            segments: DEFAULT_SEGMENTS,
            latency: Duration::ZERO,
            fault: Mutex::new(RoutingFault::Healthy),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            calls: AtomicU64::new(0),
        }
    }

    /// Sets the number of segments per route (at least one).
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments.max(1);
        self
    }

    /// Delays every answer by `latency` of virtual time.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sets the initial fault mode.
    pub fn with_fault(self, fault: RoutingFault) -> Self {
        self.set_fault(fault);
        self
    }

    /// Switches the fault mode for subsequent requests.
    pub fn set_fault(&self, fault: RoutingFault) {
        *self.fault.lock().unwrap_or_else(|p| p.into_inner()) = fault;
    }

    pub fn fault(&self) -> RoutingFault {
        *self.fault.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Number of route requests received so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Builds the synthetic route without any fault injection.
    pub fn plan(&self, origin: Coordinate, destination: Coordinate) -> RouteSummary {
        let from = Point::new(origin.longitude, origin.latitude);
        let to = Point::new(destination.longitude, destination.latitude);

        let path = (0..=self.segments)
            .map(|i| {
                if i == 0 {
                    origin
                } else if i == self.segments {
                    destination
                } else {
                    let p = from.haversine_intermediate(&to, i as f64 / self.segments as f64);
                    Coordinate::new(p.x(), p.y())
                }
            })
            .collect();

        let distance_km = from.haversine_distance(&to) / 1000.0;
        RouteSummary {
            distance_km,
            eta_minutes: distance_km / AVERAGE_SPEED_KMH * 60.0,
            path,
        }
    }

    fn draw_failure(&self, failure_rate: f64) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        rng.gen_bool(failure_rate.clamp(0.0, 1.0))
    }
}

#[async_trait]
impl RoutingEngine for SimRoutingEngine {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, EnvError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let fault = self.fault();
        debug!(call, ?fault, %origin, %destination, "simulated route request");
        match fault {
            RoutingFault::Healthy => Ok(self.plan(origin, destination)),
            RoutingFault::Outage => Err(EnvError::routing("simulated outage")),
            RoutingFault::EmptyRoutes => Ok(RouteSummary {
                distance_km: 0.0,
                eta_minutes: 0.0,
                path: Vec::new(),
            }),
            RoutingFault::Flaky { failure_rate } => {
                if self.draw_failure(failure_rate) {
                    Err(EnvError::routing("simulated transient failure"))
                } else {
                    Ok(self.plan(origin, destination))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lng: f64, lat: f64) -> Coordinate {
        Coordinate::new(lng, lat)
    }

    #[test]
    fn test_plan_endpoints_and_length() {
        let engine = SimRoutingEngine::new(1);
        let route = engine.plan(at(-74.0, 40.7), at(-73.9, 40.8));

        assert_eq!(route.path.len(), DEFAULT_SEGMENTS + 1);
        assert_eq!(route.path[0], at(-74.0, 40.7));
        assert_eq!(route.path[DEFAULT_SEGMENTS], at(-73.9, 40.8));
    }

    #[test]
    fn test_plan_distance_and_eta() {
        // One degree of latitude is roughly 111 km
        let engine = SimRoutingEngine::new(1).with_segments(4);
        let route = engine.plan(at(0.0, 0.0), at(0.0, 1.0));

        assert!((route.distance_km - 111.2).abs() < 0.5);
        assert!((route.eta_minutes - route.distance_km * 2.0).abs() < 1e-9);
        assert!((route.path[2].latitude - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_plan_same_point() {
        let engine = SimRoutingEngine::new(1).with_segments(3);
        let route = engine.plan(at(5.0, 5.0), at(5.0, 5.0));

        assert_eq!(route.path.len(), 4);
        assert_eq!(route.distance_km, 0.0);
    }

    #[tokio::test]
    async fn test_fault_modes() {
        let engine = SimRoutingEngine::new(1).with_fault(RoutingFault::Outage);
        assert!(matches!(
            engine.route(at(0.0, 0.0), at(1.0, 1.0)).await,
            Err(EnvError::RoutingUnavailable(_))
        ));

        engine.set_fault(RoutingFault::EmptyRoutes);
        assert!(engine.route(at(0.0, 0.0), at(1.0, 1.0)).await.unwrap().path.is_empty());

        engine.set_fault(RoutingFault::Healthy);
        assert_eq!(engine.route(at(0.0, 0.0), at(1.0, 1.0)).await.unwrap().path.len(), 51);
        assert_eq!(engine.calls(), 3);
    }

    #[tokio::test]
    async fn test_flaky_is_deterministic() {
        async fn outcomes(seed: u64) -> Vec<bool> {
            let engine = SimRoutingEngine::new(seed).with_fault(RoutingFault::Flaky { failure_rate: 0.5 });
            let mut out = Vec::new();
            for _ in 0..32 {
                out.push(engine.route(at(0.0, 0.0), at(1.0, 1.0)).await.is_ok());
            }
            out
        }

        let first = outcomes(99).await;
        assert_eq!(first, outcomes(99).await);
        assert!(first.iter().any(|ok| *ok));
        assert!(first.iter().any(|ok| !*ok));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_uses_virtual_time() {
        let engine = SimRoutingEngine::new(1).with_latency(Duration::from_millis(800));
        let started = tokio::time::Instant::now();
        engine.route(at(0.0, 0.0), at(1.0, 1.0)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(800));
    }
}
