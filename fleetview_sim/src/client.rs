//! Simulated client connection that records everything it receives.

use fleetview_env::{ConnectionId, Coordinate, LocalTransport, RouteCalculated, ServerMessage};
use tokio::sync::mpsc::UnboundedReceiver;

/// A `LocalTransport` connection plus a log of delivered messages.
pub struct SimClient {
    connection: ConnectionId,
    inbox: UnboundedReceiver<ServerMessage>,
    received: Vec<ServerMessage>,
}

impl SimClient {
    /// Registers a new connection on `hub`.
    pub fn connect(hub: &LocalTransport) -> Self {
        Self::connect_as(hub, ConnectionId::new())
    }

    /// Registers a connection with a fixed id, so seeded runs reproduce
    /// connection ids in their logs.
    pub fn connect_as(hub: &LocalTransport, connection: ConnectionId) -> Self {
        let (connection, inbox) = hub.connect_as(connection);
        Self {
            connection,
            inbox,
            received: Vec::new(),
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Moves every pending message into the log. Returns how many arrived.
    pub fn drain(&mut self) -> usize {
        let before = self.received.len();
        while let Ok(message) = self.inbox.try_recv() {
            self.received.push(message);
        }
        self.received.len() - before
    }

    pub fn received(&self) -> &[ServerMessage] {
        &self.received
    }

    /// Forgets everything recorded so far.
    pub fn clear(&mut self) {
        self.received.clear();
    }

    /// Positions from `driver-location` messages, in arrival order.
    pub fn locations(&self) -> Vec<Coordinate> {
        self.received
            .iter()
            .filter_map(|m| match m {
                ServerMessage::DriverLocation(loc) => Some(loc.position()),
                _ => None,
            })
            .collect()
    }

    pub fn routes(&self) -> Vec<&RouteCalculated> {
        self.received
            .iter()
            .filter_map(|m| match m {
                ServerMessage::RouteCalculated(route) => Some(route),
                _ => None,
            })
            .collect()
    }

    /// Machine codes of received `error` messages.
    pub fn error_codes(&self) -> Vec<&str> {
        self.received
            .iter()
            .filter_map(|m| match m {
                ServerMessage::Error(err) => Some(err.code.as_str()),
                _ => None,
            })
            .collect()
    }
}
