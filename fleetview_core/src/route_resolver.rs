//! RouteResolver - wraps the Routing Engine collaborator.
//!
//! Turns two coordinates into an ordered waypoint path plus summary
//! metrics. Empty answers become `RoutingEmptyResult`; unavailable engines
//! are retried according to the configured [`RetryPolicy`] (default: never).

use crate::config::{RetryPolicy, TrackerConfig};
use crate::error::TrackingError;
use fleetview_env::{Coordinate, EnvError, RouteSummary, RoutingEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Resolves routes through a [`RoutingEngine`].
pub struct RouteResolver<R: RoutingEngine> {
    engine: Arc<R>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl<R: RoutingEngine> RouteResolver<R> {
    pub fn new(engine: Arc<R>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self { engine, retry, timeout }
    }

    /// Creates a resolver using the retry and timeout settings of `config`.
    pub fn from_config(engine: Arc<R>, config: &TrackerConfig) -> Self {
        Self::new(engine, config.retry.clone(), config.routing_timeout)
    }

    /// Returns the wrapped engine.
    pub fn engine(&self) -> &Arc<R> {
        &self.engine
    }

    /// Resolves a route from `origin` to `destination`.
    ///
    /// Equal endpoints are not rejected here; whatever the engine returns
    /// is passed through, subject to the empty-path check.
    ///
    /// # Errors
    /// * `RoutingUnavailable` - engine unreachable/failed after all attempts
    /// * `RoutingEmptyResult` - engine succeeded with zero waypoints (never retried)
    pub async fn resolve(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, TrackingError> {
        let mut attempt: u32 = 0;
        loop {
            match self.attempt(origin, destination).await {
                Ok(summary) if summary.path.is_empty() => return Err(TrackingError::RoutingEmptyResult),
                Ok(summary) => {
                    debug!(
                        waypoints = summary.path.len(),
                        distance_km = summary.distance_km,
                        eta_minutes = summary.eta_minutes,
                        "route resolved"
                    );
                    return Ok(summary);
                }
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        error = %err,
                        attempt,
                        max_retries = self.retry.max_retries,
                        "routing engine unavailable, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, TrackingError> {
        match tokio::time::timeout(self.timeout, self.engine.route(origin, destination)).await {
            Ok(result) => result.map_err(TrackingError::from),
            Err(_) => Err(EnvError::Timeout(self.timeout.as_millis() as u64).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedRouting};

    fn resolver(engine: ScriptedRouting, max_retries: u32) -> RouteResolver<ScriptedRouting> {
        RouteResolver::new(
            Arc::new(engine),
            RetryPolicy {
                max_retries,
                backoff: Duration::from_millis(100),
            },
            Duration::from_secs(5),
        )
    }

    const A: Coordinate = Coordinate { longitude: 0.0, latitude: 0.0 };
    const B: Coordinate = Coordinate { longitude: 5.0, latitude: 5.0 };

    #[tokio::test]
    async fn test_resolve_passes_path_through() {
        let r = resolver(ScriptedRouting::with_path(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]), 0);
        let summary = r.resolve(A, B).await.unwrap();
        assert_eq!(summary.path.len(), 3);
        assert_eq!(summary.path[2], Coordinate::new(2.0, 2.0));
    }

    #[tokio::test]
    async fn test_empty_path_is_empty_result() {
        let r = resolver(ScriptedRouting::new(Reply::Empty), 3);
        assert_eq!(r.resolve(A, B).await.unwrap_err(), TrackingError::RoutingEmptyResult);
        // Empty results are never retried
        assert_eq!(r.engine().calls(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_without_retry() {
        let r = resolver(ScriptedRouting::new(Reply::Down), 0);
        let err = r.resolve(A, B).await.unwrap_err();
        assert!(matches!(err, TrackingError::RoutingUnavailable(_)));
        assert_eq!(r.engine().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_retry_recovers() {
        let engine = ScriptedRouting::with_path(&[[0.0, 0.0], [1.0, 1.0]]);
        engine.push(Reply::Down);
        engine.push(Reply::Down);

        let r = resolver(engine, 2);
        let summary = r.resolve(A, B).await.unwrap();
        assert_eq!(summary.path.len(), 2);
        assert_eq!(r.engine().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_retry_gives_up() {
        let r = resolver(ScriptedRouting::new(Reply::Down), 2);
        assert!(r.resolve(A, B).await.is_err());
        assert_eq!(r.engine().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_engine_times_out() {
        let r = resolver(ScriptedRouting::new(Reply::Hang), 0);
        let err = r.resolve(A, B).await.unwrap_err();
        assert!(matches!(err, TrackingError::RoutingUnavailable(msg) if msg == "timed out after 5000ms"));
    }
}
