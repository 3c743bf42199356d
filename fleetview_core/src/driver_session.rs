//! DriverSession - one simulated vehicle and its traversal state machine.
//!
//! ```text
//!            begin()                 advance() x len(path)
//!   Idle ─────────────► Traversing ─────────────────────► Arrived
//!    ▲                     │  ▲                              │
//!    │       stop()        │  └──────── begin() ────────────┤ (restart: rebase)
//!    └─────────────────────┴────────────────────────────────┘
//! ```
//!
//! A session never owns more than one ticker: `begin()` cancels and awaits
//! the previous ticker before any state is rewritten.

use crate::error::TrackingError;
use crate::validation::ensure_finite;
use fleetview_env::{Coordinate, DriverId};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

// ============================================================================
// STATE
// ============================================================================

/// Traversal state derived from path and cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No route
    Idle,
    /// Route set, waypoints remaining
    Traversing,
    /// Every waypoint visited; keeps ticking until stopped
    Arrived,
}

/// Result of one `advance()` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdvanceOutcome {
    /// Moved onto the next waypoint
    Moved(Coordinate),
    /// Already at the end of the path; position unchanged
    Arrived(Coordinate),
    /// No route to advance along
    Idle,
}

impl AdvanceOutcome {
    /// Position to broadcast for this tick, if any.
    pub fn position(&self) -> Option<Coordinate> {
        match self {
            AdvanceOutcome::Moved(p) | AdvanceOutcome::Arrived(p) => Some(*p),
            AdvanceOutcome::Idle => None,
        }
    }
}

/// Read-only view of a session for inspection and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub driver_id: DriverId,
    pub state: SessionState,
    pub position: Coordinate,
    pub target: Option<Coordinate>,
    pub cursor: usize,
    pub path_len: usize,
    pub ticker_active: bool,
    /// Number of successful `begin()` calls
    pub trips: u64,
}

// ============================================================================
// TICKER HANDLE
// ============================================================================

/// Owning handle of a running advance/broadcast loop.
///
/// Dropping the handle also stops the loop (the shutdown sender closes),
/// but only [`TickerHandle::cancel`] confirms it has finished.
#[derive(Debug)]
pub struct TickerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TickerHandle {
    pub fn new(shutdown: watch::Sender<bool>, join: JoinHandle<()>) -> Self {
        Self { shutdown, join }
    }

    /// Returns false once the loop has exited (cancelled or faulted).
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Signals shutdown and waits for the loop to finish.
    pub async fn cancel(self) {
        // Err means the loop already exited and dropped its receiver
        let _ = self.shutdown.send(true);
        match self.join.await {
            Ok(()) => {}
            Err(e) if e.is_panic() => warn!("ticker panicked before cancellation: {}", e),
            Err(e) => debug!("ticker ended abnormally: {}", e),
        }
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// Mutable simulation state of one driver.
#[derive(Debug)]
pub struct DriverSession {
    driver_id: DriverId,
    position: Coordinate,
    target: Option<Coordinate>,
    path: Vec<Coordinate>,
    /// Index of the next waypoint; `cursor == path.len()` means arrived
    cursor: usize,
    ticker: Option<TickerHandle>,
    trips: u64,
    /// Set once the registry entry is gone; a retired session is never reused
    retired: bool,
}

impl DriverSession {
    /// Creates an `Idle` session at `initial` position.
    pub fn new(driver_id: DriverId, initial: Coordinate) -> Self {
        Self {
            driver_id,
            position: initial,
            target: None,
            path: Vec::new(),
            cursor: 0,
            ticker: None,
            trips: 0,
            retired: false,
        }
    }

    pub fn driver_id(&self) -> &DriverId {
        &self.driver_id
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    pub fn state(&self) -> SessionState {
        if self.path.is_empty() {
            SessionState::Idle
        } else if self.cursor >= self.path.len() {
            SessionState::Arrived
        } else {
            SessionState::Traversing
        }
    }

    /// True while a ticker loop owns this session.
    pub fn ticker_active(&self) -> bool {
        self.ticker.as_ref().is_some_and(TickerHandle::is_running)
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Starts (or restarts) a traversal of `path` from `start`.
    ///
    /// Validation happens before anything is touched, so a failed call
    /// leaves position, path, cursor and ticker exactly as they were.
    /// On success any existing ticker has been cancelled and awaited; the
    /// caller arms the new one with [`DriverSession::attach_ticker`].
    /// Restarting always rebases onto `start`, discarding prior progress.
    pub async fn begin(
        &mut self,
        start: Coordinate,
        target: Coordinate,
        path: Vec<Coordinate>,
    ) -> Result<(), TrackingError> {
        ensure_finite(start, "start")?;
        ensure_finite(target, "target")?;
        if path.is_empty() {
            return Err(TrackingError::RoutingEmptyResult);
        }

        self.cancel_ticker().await;

        self.position = start;
        self.target = Some(target);
        self.path = path;
        self.cursor = 0;
        self.trips += 1;

        debug!(
            driver_id = %self.driver_id,
            waypoints = self.path.len(),
            trip = self.trips,
            "session rebased onto new route"
        );
        Ok(())
    }

    /// Hands ownership of a freshly armed ticker to the session.
    pub fn attach_ticker(&mut self, ticker: TickerHandle) {
        debug_assert!(!self.ticker_active(), "ticker attached while another is running");
        self.ticker = Some(ticker);
    }

    /// Moves onto the next waypoint; one waypoint per call.
    pub fn advance(&mut self) -> AdvanceOutcome {
        if self.path.is_empty() {
            return AdvanceOutcome::Idle;
        }
        match self.path.get(self.cursor) {
            Some(&next) => {
                self.position = next;
                self.cursor += 1;
                AdvanceOutcome::Moved(next)
            }
            None => AdvanceOutcome::Arrived(self.position),
        }
    }

    /// Cancels the ticker and clears the route. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        self.cancel_ticker().await;
        self.path.clear();
        self.target = None;
        self.cursor = 0;
    }

    /// Marks the session as detached from the registry.
    pub fn retire(&mut self) {
        self.retired = true;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            driver_id: self.driver_id.clone(),
            state: self.state(),
            position: self.position,
            target: self.target,
            cursor: self.cursor,
            path_len: self.path.len(),
            ticker_active: self.ticker_active(),
            trips: self.trips,
        }
    }

    async fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel().await;
            debug!(driver_id = %self.driver_id, "ticker cancelled");
        }
    }
}
