//! Simulation context implementing TrackerContext for deterministic testing.

use async_trait::async_trait;
use fleetview_env::TrackerContext;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Simulation context backed by deterministic time and RNG.
///
/// This implements `TrackerContext` using:
/// - Tokio's clock, which the harness runs paused so it only moves when every task is idle
/// - Seeded ChaCha8 streams for any randomness a scenario needs
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Virtual time zero
    start: Instant,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    ///
    /// Must be called inside the runtime whose clock it should follow.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Returns an independent RNG stream derived from the master seed.
    ///
    /// Same seed and stream always yield the same sequence.
    pub fn rng(&self, stream: u64) -> ChaCha8Rng {
        let combined_seed = self.seed.wrapping_mul(0x517cc1b727220a95) ^ stream;
        ChaCha8Rng::seed_from_u64(combined_seed)
    }
}

#[async_trait]
impl TrackerContext for SimContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        // With a paused clock this yields until the runtime auto-advances
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tracing::trace!(task = name, seed = self.seed, "spawning simulated task");
        tokio::spawn(future)
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[tokio::test(start_paused = true)]
    async fn test_sim_context_time() {
        let ctx = SimContext::new(42);
        assert_eq!(ctx.now(), Duration::ZERO);

        ctx.sleep(Duration::from_secs(1)).await;
        assert_eq!(ctx.now(), Duration::from_secs(1));

        ctx.sleep(Duration::from_millis(500)).await;
        assert_eq!(ctx.now(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_sim_context_deterministic_streams() {
        let ctx1 = SimContext::new(42);
        let ctx2 = SimContext::new(42);

        let a: Vec<u64> = (0..4).map(|_| ctx1.rng(1).gen()).collect();
        let mut s1 = ctx1.rng(1);
        let mut s2 = ctx2.rng(1);
        let mut s3 = ctx1.rng(2);

        let x1: u64 = s1.gen();
        let x2: u64 = s2.gen();
        let x3: u64 = s3.gen();

        // Same seed + stream = same sequence
        assert_eq!(x1, x2);
        // Different stream = different sequence
        assert_ne!(x1, x3);
        // A fresh stream restarts from the beginning
        assert!(a.iter().all(|v| *v == x1));
    }

    #[tokio::test]
    async fn test_sim_context_seed() {
        let ctx = SimContext::new(12345);
        assert_eq!(ctx.seed(), 12345);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_runs_on_virtual_clock() {
        let ctx = SimContext::shared(7);
        let inner = Arc::clone(&ctx);
        let handle = ctx.spawn("sleeper", async move {
            inner.sleep(Duration::from_secs(30)).await;
        });

        handle.await.unwrap();
        assert_eq!(ctx.now(), Duration::from_secs(30));
    }
}
