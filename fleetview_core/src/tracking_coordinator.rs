//! TrackingCoordinator - binds the registry to the real-time transport.
//!
//! Handles inbound lifecycle requests and owns one periodic ticker per
//! traversing driver.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TrackingCoordinator                      │
//! │                                                             │
//! │  start-tracking ──► RouteResolver ──► DriverSession.begin() │
//! │                          │                    │             │
//! │                    Routing Engine        arm Ticker         │
//! │                                               │             │
//! │  ┌──────────── Ticker (one per driver) ───────▼──────────┐  │
//! │  │ sleep(tick) → lock session → advance() → publish      │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! │                                               │             │
//! │  stop-tracking / disconnect ─► cancel + await ticker        │
//! └───────────────────────────────────────────────┼─────────────┘
//!                                                 ▼
//!                                   driver-<id> topic (transport)
//! ```
//!
//! Every mutation of one driver's state goes through that session's mutex,
//! so a start, a stop and a tick for the same driver never interleave.
//! Tickers for different drivers share nothing but the transport.

use crate::config::TrackerConfig;
use crate::driver_registry::{DriverRegistry, SharedSession};
use crate::driver_session::{SessionSnapshot, TickerHandle};
use crate::error::TrackingError;
use crate::metrics::{ActiveTickerGuard, EngineMetrics, TrackerStats};
use crate::route_resolver::RouteResolver;
use crate::validation::{ensure_finite, validate_start};

use dashmap::DashMap;
use fleetview_env::{
    ClientRequest, ConnectionId, Coordinate, DriverId, DriverLocation, RealtimeTransport, RouteCalculated,
    RouteGeometry, RouteRequest, RouteSummary, RoutingEngine, ServerMessage, StartTracking, Topic,
    TrackerContext,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Builds the `route-calculated` payload for a resolved route.
pub fn route_calculated(summary: &RouteSummary) -> RouteCalculated {
    RouteCalculated {
        distance_km: summary.distance_km,
        eta_minutes: summary.eta_minutes,
        route: RouteGeometry::line_string(summary.path.clone()),
    }
}

/// The tracking engine front door.
///
/// Generic over the runtime context, transport and routing engine so the
/// same code runs in production and in the simulation harness.
pub struct TrackingCoordinator<Ctx, Net, R>
where
    Ctx: TrackerContext,
    Net: RealtimeTransport,
    R: RoutingEngine,
{
    context: Arc<Ctx>,
    transport: Arc<Net>,
    resolver: RouteResolver<R>,
    registry: DriverRegistry,

    /// Driver each connection is following (stop-tracking is scoped by it)
    bindings: DashMap<ConnectionId, DriverId>,

    metrics: Arc<EngineMetrics>,
    config: TrackerConfig,
}

impl<Ctx, Net, R> TrackingCoordinator<Ctx, Net, R>
where
    Ctx: TrackerContext,
    Net: RealtimeTransport,
    R: RoutingEngine,
{
    pub fn new(context: Arc<Ctx>, transport: Arc<Net>, routing: Arc<R>, config: TrackerConfig) -> Self {
        let resolver = RouteResolver::from_config(routing, &config);
        Self {
            context,
            transport,
            resolver,
            registry: DriverRegistry::new(),
            bindings: DashMap::new(),
            metrics: EngineMetrics::shared(),
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    pub fn stats(&self) -> TrackerStats {
        self.metrics.snapshot()
    }

    /// Ids of all drivers with a registered session.
    pub fn active_drivers(&self) -> Vec<DriverId> {
        self.registry.driver_ids()
    }

    /// Driver currently followed by `connection`, if any.
    pub fn bound_driver(&self, connection: ConnectionId) -> Option<DriverId> {
        self.bindings.get(&connection).map(|entry| entry.value().clone())
    }

    /// Inspects one session. Waits for any in-flight start/stop/tick.
    pub async fn snapshot(&self, driver_id: &DriverId) -> Option<SessionSnapshot> {
        let session = self.registry.get(driver_id)?;
        let guard = session.lock().await;
        Some(guard.snapshot())
    }

    // ========================================================================
    // DRIVER LIFECYCLE
    // ========================================================================

    /// Starts or restarts tracking of `driver_id` from `start` to `target`.
    ///
    /// Resolves the route, rebases the session and arms a fresh ticker. Any
    /// failure aborts before the session is mutated and before a ticker is
    /// armed. On success `route-calculated` is published once on the driver
    /// topic.
    pub async fn handle_start(
        &self,
        driver_id: &DriverId,
        start: Coordinate,
        target: Coordinate,
    ) -> Result<RouteSummary, TrackingError> {
        match self.start_traversal(driver_id, start, target).await {
            Ok(summary) => {
                self.metrics.record_start_accepted();
                info!(
                    driver_id = %driver_id,
                    %start,
                    %target,
                    waypoints = summary.path.len(),
                    distance_km = summary.distance_km,
                    "tracking started"
                );
                Ok(summary)
            }
            Err(err) => {
                self.metrics.record_start_failed();
                warn!(driver_id = %driver_id, error = %err, code = err.code(), "tracking start rejected");
                Err(err)
            }
        }
    }

    async fn start_traversal(
        &self,
        driver_id: &DriverId,
        start: Coordinate,
        target: Coordinate,
    ) -> Result<RouteSummary, TrackingError> {
        ensure_finite(start, "start")?;
        ensure_finite(target, "target")?;

        // Registered before routing so a failed first start still leaves an Idle session
        self.registry.get_or_create(driver_id, start);

        // Routing runs without the session lock: ticks and stops proceed meanwhile
        let summary = self.resolver.resolve(start, target).await?;

        loop {
            let session = self.registry.get_or_create(driver_id, start);
            let mut guard = session.lock().await;
            if guard.is_retired() {
                // A stop detached this session while we waited; use a fresh entry
                continue;
            }

            guard.begin(start, target, summary.path.clone()).await?;
            let ticker = self.spawn_ticker(driver_id, &session);
            guard.attach_ticker(ticker);

            // Published under the lock so a concurrent stop cannot precede it
            let topic = Topic::driver(driver_id);
            let message = ServerMessage::RouteCalculated(route_calculated(&summary));
            if let Err(err) = self.transport.publish(&topic, message).await {
                warn!(driver_id = %driver_id, error = %err, "failed to publish route summary");
            }
            return Ok(summary);
        }
    }

    /// Stops tracking of `driver_id` and removes its session.
    ///
    /// Returns false when there was nothing to stop. Never fails.
    pub async fn handle_stop(&self, driver_id: &DriverId) -> bool {
        let stopped = self.teardown(driver_id).await;
        if stopped {
            info!(driver_id = %driver_id, "tracking stopped");
        } else {
            debug!(driver_id = %driver_id, "stop for unknown driver ignored");
        }
        stopped
    }

    /// Same effect as [`handle_stop`](Self::handle_stop); invoked when the
    /// owning client connection closes.
    pub async fn handle_disconnect(&self, driver_id: &DriverId) -> bool {
        let stopped = self.teardown(driver_id).await;
        if stopped {
            info!(driver_id = %driver_id, "client disconnected, driver stopped");
        }
        stopped
    }

    async fn teardown(&self, driver_id: &DriverId) -> bool {
        let Some(session) = self.registry.get(driver_id) else {
            return false;
        };

        let mut guard = session.lock().await;
        if guard.is_retired() {
            return false;
        }
        guard.stop().await;
        guard.retire();
        self.registry.remove_if_same(driver_id, &session);
        drop(guard);

        self.metrics.record_stop();
        true
    }

    /// Resolves a route without touching any driver session.
    pub async fn handle_calculate_route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<RouteCalculated, TrackingError> {
        ensure_finite(from, "from")?;
        ensure_finite(to, "to")?;
        let summary = self.resolver.resolve(from, to).await?;
        Ok(route_calculated(&summary))
    }

    // ========================================================================
    // CONNECTION-SCOPED REQUESTS
    // ========================================================================

    /// Dispatches one request received on `connection`.
    ///
    /// Failures are answered with an `error` message to that connection
    /// only, and returned.
    pub async fn handle_request(&self, connection: ConnectionId, request: ClientRequest) -> Result<(), TrackingError> {
        let result = match request {
            ClientRequest::StartTracking(payload) => self.start_for_connection(connection, &payload).await,
            ClientRequest::StopTracking(_) => {
                self.stop_for_connection(connection).await;
                Ok(())
            }
            ClientRequest::CalculateRoute(route) => self.calculate_for_connection(connection, route).await,
        };

        if let Err(err) = &result {
            if let Err(send_err) = self.transport.send_to(connection, err.to_message()).await {
                debug!(%connection, error = %send_err, "could not deliver error reply");
            }
        }
        result
    }

    /// Tears down whatever `connection` was following.
    pub async fn handle_connection_closed(&self, connection: ConnectionId) {
        match self.bindings.remove(&connection) {
            Some((_, driver_id)) => {
                self.handle_disconnect(&driver_id).await;
            }
            None => debug!(%connection, "connection closed without a tracked driver"),
        }
    }

    async fn start_for_connection(&self, connection: ConnectionId, payload: &StartTracking) -> Result<(), TrackingError> {
        let endpoints = match validate_start(payload) {
            Ok(endpoints) => endpoints,
            Err(err) => {
                self.metrics.record_start_failed();
                warn!(%connection, driver_id = %payload.driver_id, error = %err, "invalid start-tracking request");
                return Err(err);
            }
        };

        let driver_id = payload.driver_id.clone();
        let topic = Topic::driver(&driver_id);
        self.transport.join(connection, &topic).await?;

        // A connection follows one driver at a time
        let previous = self.bindings.insert(connection, driver_id.clone());
        let rebinding = previous.as_ref() == Some(&driver_id);
        if let Some(previous) = previous.filter(|p| *p != driver_id) {
            info!(%connection, from = %previous, to = %driver_id, "connection switched drivers");
            self.transport.leave(connection, &Topic::driver(&previous)).await;
            // Drivers still followed by another connection keep running
            if !self.is_followed(&previous) {
                self.handle_stop(&previous).await;
            }
        }

        if let Err(err) = self.handle_start(&driver_id, endpoints.start, endpoints.target).await {
            if !rebinding {
                self.bindings.remove_if(&connection, |_, bound| *bound == driver_id);
                self.transport.leave(connection, &topic).await;
            }
            return Err(err);
        }
        Ok(())
    }

    fn is_followed(&self, driver_id: &DriverId) -> bool {
        self.bindings.iter().any(|entry| entry.value() == driver_id)
    }

    async fn stop_for_connection(&self, connection: ConnectionId) {
        let Some((_, driver_id)) = self.bindings.remove(&connection) else {
            debug!(%connection, "stop-tracking without a tracked driver ignored");
            return;
        };
        self.handle_stop(&driver_id).await;
        self.transport.leave(connection, &Topic::driver(&driver_id)).await;
    }

    async fn calculate_for_connection(&self, connection: ConnectionId, route: RouteRequest) -> Result<(), TrackingError> {
        let calculated = self.handle_calculate_route(route.from.into(), route.to.into()).await?;
        self.transport
            .send_to(connection, ServerMessage::RouteCalculated(calculated))
            .await?;
        Ok(())
    }

    // ========================================================================
    // TICKERS
    // ========================================================================

    fn spawn_ticker(&self, driver_id: &DriverId, session: &SharedSession) -> TickerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ticker = Ticker {
            driver_id: driver_id.clone(),
            topic: Topic::driver(driver_id),
            period: self.config.tick_interval,
            session: Arc::clone(session),
            context: Arc::clone(&self.context),
            transport: Arc::clone(&self.transport),
            metrics: Arc::clone(&self.metrics),
        };

        let alive = self.metrics.ticker_guard();
        let name = format!("ticker-{}", driver_id);
        let join = self.context.spawn(&name, ticker.run(shutdown_rx, alive));
        TickerHandle::new(shutdown_tx, join)
    }
}

/// One driver's advance/broadcast loop.
struct Ticker<Ctx, Net> {
    driver_id: DriverId,
    topic: Topic,
    period: Duration,
    session: SharedSession,
    context: Arc<Ctx>,
    transport: Arc<Net>,
    metrics: Arc<EngineMetrics>,
}

impl<Ctx, Net> Ticker<Ctx, Net>
where
    Ctx: TrackerContext,
    Net: RealtimeTransport,
{
    /// Runs until shutdown is signalled or a tick fails.
    ///
    /// Every await point also listens for shutdown, so a canceller holding
    /// the session lock never waits on a ticker that waits on that lock.
    async fn run(self, mut shutdown: watch::Receiver<bool>, _alive: ActiveTickerGuard) {
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = self.context.sleep(self.period) => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                mut session = self.session.lock() => session.advance(),
            };

            let Some(position) = outcome.position() else {
                warn!(driver_id = %self.driver_id, "ticker found session without a route, stopping");
                self.metrics.record_ticker_fault();
                break;
            };

            let message = ServerMessage::DriverLocation(DriverLocation::new(self.driver_id.clone(), position));
            let published = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                result = self.transport.publish(&self.topic, message) => result,
            };

            match published {
                Ok(delivered) => {
                    ticks += 1;
                    self.metrics.record_tick();
                    trace!(driver_id = %self.driver_id, tick = ticks, delivered, %position, "location broadcast");
                }
                Err(err) => {
                    error!(driver_id = %self.driver_id, error = %err, "location broadcast failed, stopping ticker");
                    self.metrics.record_ticker_fault();
                    break;
                }
            }
        }

        debug!(driver_id = %self.driver_id, ticks, "ticker exited");
    }
}
