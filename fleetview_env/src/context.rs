//! Core runtime context trait for FleetView engines.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// The central interface for runtime interaction.
///
/// This trait abstracts time and task scheduling so that the tracking
/// engine runs unchanged in production (tokio wall clock) and in the
/// simulation harness (seeded, paused clock).
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, `tokio::spawn`
/// - **Simulation**: `SimContext` - paused tokio clock + seeded RNG
#[async_trait]
pub trait TrackerContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Used for tick timestamps and duration measurements.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task and returns its join handle.
    ///
    /// The handle lets owners confirm a task has fully finished before
    /// reusing the state it touched.
    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
