//! Scripted collaborators shared by unit tests.

use async_trait::async_trait;
use fleetview_env::{Coordinate, EnvError, RouteSummary, RoutingEngine};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the scripted engine answers.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Path(Vec<Coordinate>),
    Empty,
    Down,
    Hang,
}

/// Routing engine answering from a script instead of the network.
pub(crate) struct ScriptedRouting {
    queued: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Reply>,
    calls: AtomicUsize,
}

impl ScriptedRouting {
    pub(crate) fn new(fallback: Reply) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            calls: AtomicUsize::new(0),
        }
    }

    /// Engine that always answers with `path`.
    pub(crate) fn with_path(path: &[[f64; 2]]) -> Self {
        Self::new(Reply::Path(coords(path)))
    }

    /// Answers `reply` once before falling back.
    pub(crate) fn push(&self, reply: Reply) {
        self.queued.lock().unwrap().push_back(reply);
    }

    /// Replaces the fallback answer.
    pub(crate) fn set(&self, reply: Reply) {
        *self.fallback.lock().unwrap() = reply;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingEngine for ScriptedRouting {
    async fn route(&self, _origin: Coordinate, _destination: Coordinate) -> Result<RouteSummary, EnvError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone());

        match reply {
            Reply::Path(path) => Ok(RouteSummary {
                distance_km: path.len() as f64,
                eta_minutes: 2.0 * path.len() as f64,
                path,
            }),
            Reply::Empty => Ok(RouteSummary {
                distance_km: 0.0,
                eta_minutes: 0.0,
                path: Vec::new(),
            }),
            Reply::Down => Err(EnvError::routing("engine down")),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(EnvError::routing("engine hung"))
            }
        }
    }
}

pub(crate) fn coords(points: &[[f64; 2]]) -> Vec<Coordinate> {
    points.iter().copied().map(Coordinate::from).collect()
}
