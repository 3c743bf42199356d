//! DriverRegistry - keyed ownership map from driver id to session.
//!
//! Sharded (`DashMap`) so lookups for different drivers never contend on a
//! single lock; the entry API makes get-or-create atomic per id. Each value
//! is the session's own async mutex, its single-owner execution context.

use crate::driver_session::DriverSession;
use dashmap::DashMap;
use fleetview_env::{Coordinate, DriverId};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A session behind its serializing mutex.
pub type SharedSession = Arc<Mutex<DriverSession>>;

/// Concurrency-safe id → session map. Does not manage tickers.
#[derive(Debug, Default)]
pub struct DriverRegistry {
    sessions: DashMap<DriverId, SharedSession>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `driver_id`, creating an `Idle` one at
    /// `initial` if absent. An existing session is returned unchanged.
    pub fn get_or_create(&self, driver_id: &DriverId, initial: Coordinate) -> SharedSession {
        let entry = self
            .sessions
            .entry(driver_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(DriverSession::new(driver_id.clone(), initial))));
        Arc::clone(entry.value())
    }

    pub fn get(&self, driver_id: &DriverId) -> Option<SharedSession> {
        self.sessions.get(driver_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes the entry unconditionally.
    pub fn remove(&self, driver_id: &DriverId) -> Option<SharedSession> {
        self.sessions.remove(driver_id).map(|(_, session)| session)
    }

    /// Removes the entry only if it still holds `session`.
    ///
    /// Guards against deleting a newer session created for the same id.
    pub fn remove_if_same(&self, driver_id: &DriverId, session: &SharedSession) -> bool {
        self.sessions
            .remove_if(driver_id, |_, current| Arc::ptr_eq(current, session))
            .is_some()
    }

    pub fn contains(&self, driver_id: &DriverId) -> bool {
        self.sessions.contains_key(driver_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of all registered drivers, sorted.
    pub fn driver_ids(&self) -> Vec<DriverId> {
        let mut ids: Vec<DriverId> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }
}
