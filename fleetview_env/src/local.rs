//! In-process topic hub implementing `RealtimeTransport`.

use crate::error::EnvError;
use crate::messages::ServerMessage;
use crate::transport::RealtimeTransport;
use crate::types::{ConnectionId, Topic};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Topic hub over unbounded tokio channels.
///
/// A server embedding the engine calls [`LocalTransport::connect`] per
/// client and forwards the returned receiver to its socket; the simulation
/// harness reads the receiver directly.
pub struct LocalTransport {
    state: Mutex<HubState>,
}

#[derive(Default)]
struct HubState {
    /// Outbound channel per live connection
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>,

    /// Members of each topic
    topics: HashMap<Topic, HashSet<ConnectionId>>,
}

impl HubState {
    fn drop_connection(&mut self, connection: ConnectionId) -> bool {
        let existed = self.connections.remove(&connection).is_some();
        self.topics.retain(|_, members| {
            members.remove(&connection);
            !members.is_empty()
        });
        existed
    }
}

impl LocalTransport {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState::default()),
        }
    }

    /// Registers a new client connection.
    pub fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        self.connect_as(ConnectionId::new())
    }

    /// Registers a client connection under a caller-chosen id.
    pub fn connect_as(&self, connection: ConnectionId) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().connections.insert(connection, tx);
        debug!(%connection, "connection registered");
        (connection, rx)
    }

    /// Removes a connection and all its topic memberships.
    ///
    /// Returns false if the connection was unknown.
    pub fn disconnect(&self, connection: ConnectionId) -> bool {
        let existed = self.lock().drop_connection(connection);
        if existed {
            debug!(%connection, "connection removed");
        }
        existed
    }

    /// Returns the number of connections subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.lock().topics.get(topic).map_or(0, HashSet::len)
    }

    /// Returns the number of live connections.
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubState> {
        // A poisoned hub only means another caller panicked mid-update; the
        // maps themselves are always left consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeTransport for LocalTransport {
    async fn publish(&self, topic: &Topic, message: ServerMessage) -> Result<usize, EnvError> {
        let mut state = self.lock();
        let members: Vec<ConnectionId> = match state.topics.get(topic) {
            Some(members) => members.iter().copied().collect(),
            None => return Ok(0),
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for connection in members {
            match state.connections.get(&connection) {
                Some(tx) if tx.send(message.clone()).is_ok() => delivered += 1,
                _ => closed.push(connection),
            }
        }

        // Receivers dropped without an explicit disconnect
        for connection in closed {
            state.drop_connection(connection);
        }

        Ok(delivered)
    }

    async fn send_to(&self, connection: ConnectionId, message: ServerMessage) -> Result<(), EnvError> {
        let mut state = self.lock();
        let sent = match state.connections.get(&connection) {
            Some(tx) => tx.send(message).is_ok(),
            None => return Err(EnvError::unknown_connection(connection)),
        };

        if !sent {
            state.drop_connection(connection);
            return Err(EnvError::unknown_connection(connection));
        }
        Ok(())
    }

    async fn join(&self, connection: ConnectionId, topic: &Topic) -> Result<(), EnvError> {
        let mut state = self.lock();
        if !state.connections.contains_key(&connection) {
            return Err(EnvError::unknown_connection(connection));
        }
        state.topics.entry(topic.clone()).or_default().insert(connection);
        Ok(())
    }

    async fn leave(&self, connection: ConnectionId, topic: &Topic) {
        let mut state = self.lock();
        if let Some(members) = state.topics.get_mut(topic) {
            members.remove(&connection);
            if members.is_empty() {
                state.topics.remove(topic);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{DriverLocation, ErrorMessage};
    use crate::types::{Coordinate, DriverId};

    fn location(id: &str) -> ServerMessage {
        ServerMessage::DriverLocation(DriverLocation::new(DriverId::new(id), Coordinate::new(1.0, 2.0)))
    }

    #[tokio::test]
    async fn test_publish_reaches_topic_members_only() {
        let hub = LocalTransport::new();
        let (a, mut rx_a) = hub.connect();
        let (_b, mut rx_b) = hub.connect();
        let topic = Topic::driver(&DriverId::new("d1"));

        hub.join(a, &topic).await.unwrap();
        let delivered = hub.publish(&topic, location("d1")).await.unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(rx_a.try_recv().unwrap(), location("d1"));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_to_empty_topic() {
        let hub = LocalTransport::new();
        let topic = Topic::driver(&DriverId::new("nobody"));
        assert_eq!(hub.publish(&topic, location("nobody")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_leave_and_disconnect() {
        let hub = LocalTransport::new();
        let (a, _rx_a) = hub.connect();
        let topic = Topic::driver(&DriverId::new("d1"));

        hub.join(a, &topic).await.unwrap();
        hub.join(a, &topic).await.unwrap();
        assert_eq!(hub.subscriber_count(&topic), 1);

        hub.leave(a, &topic).await;
        assert_eq!(hub.subscriber_count(&topic), 0);

        hub.join(a, &topic).await.unwrap();
        assert!(hub.disconnect(a));
        assert!(!hub.disconnect(a));
        assert_eq!(hub.subscriber_count(&topic), 0);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_send_to_unknown_connection() {
        let hub = LocalTransport::new();
        let msg = ServerMessage::Error(ErrorMessage {
            code: "X".to_string(),
            message: "x".to_string(),
        });

        let result = hub.send_to(ConnectionId::new(), msg).await;
        assert!(matches!(result, Err(EnvError::UnknownConnection(_))));
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let hub = LocalTransport::new();
        let (a, rx_a) = hub.connect();
        let topic = Topic::driver(&DriverId::new("d1"));
        hub.join(a, &topic).await.unwrap();

        drop(rx_a);
        assert_eq!(hub.publish(&topic, location("d1")).await.unwrap(), 0);
        assert_eq!(hub.connection_count(), 0);
    }
}
