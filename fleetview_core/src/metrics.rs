//! FleetView Engine Metrics
//! ========================
//!
//! Lock-free counters updated by the coordinator and its tickers, plus a
//! plain snapshot type for reports.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    /// `handleStart` calls that armed a ticker
    pub starts_accepted: u64,
    /// `handleStart` calls rejected (validation or routing)
    pub starts_failed: u64,
    /// Sessions torn down by stop or disconnect
    pub stops: u64,
    /// Location broadcasts published
    pub ticks_broadcast: u64,
    /// Tickers that terminated on their own after a failure
    pub tickers_faulted: u64,
    /// Ticker loops alive right now
    pub active_tickers: usize,
}

/// Shared atomic counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    starts_accepted: AtomicU64,
    starts_failed: AtomicU64,
    stops: AtomicU64,
    ticks_broadcast: AtomicU64,
    tickers_faulted: AtomicU64,
    active_tickers: AtomicUsize,
}

impl EngineMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_start_accepted(&self) {
        self.starts_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_start_failed(&self) {
        self.starts_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stop(&self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick(&self) {
        self.ticks_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ticker_fault(&self) {
        self.tickers_faulted.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks a ticker loop as alive until the returned guard is dropped.
    ///
    /// The guard travels inside the ticker future, so the count drops even
    /// when the task is aborted or panics.
    pub fn ticker_guard(self: &Arc<Self>) -> ActiveTickerGuard {
        self.active_tickers.fetch_add(1, Ordering::SeqCst);
        ActiveTickerGuard {
            metrics: Arc::clone(self),
        }
    }

    pub fn active_tickers(&self) -> usize {
        self.active_tickers.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> TrackerStats {
        TrackerStats {
            starts_accepted: self.starts_accepted.load(Ordering::Relaxed),
            starts_failed: self.starts_failed.load(Ordering::Relaxed),
            stops: self.stops.load(Ordering::Relaxed),
            ticks_broadcast: self.ticks_broadcast.load(Ordering::Relaxed),
            tickers_faulted: self.tickers_faulted.load(Ordering::Relaxed),
            active_tickers: self.active_tickers(),
        }
    }
}

/// Decrements the active ticker count on drop.
#[derive(Debug)]
pub struct ActiveTickerGuard {
    metrics: Arc<EngineMetrics>,
}

impl Drop for ActiveTickerGuard {
    fn drop(&mut self) {
        self.metrics.active_tickers.fetch_sub(1, Ordering::SeqCst);
    }
}
