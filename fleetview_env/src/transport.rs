//! Real-time transport abstraction for FleetView.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::messages::ServerMessage;
use crate::types::{ConnectionId, Topic};

/// Publish/subscribe channel delivering structured messages to clients.
///
/// # Implementations
///
/// - **In-process**: `LocalTransport` - topic hub over tokio channels, used
///   by embedding servers and by the simulation harness
///
/// # Message Flow
///
/// ```text
/// Coordinator                 Transport                    Clients
///   |                            |                            |
///   |-- publish(driver-d1) ----->|-- driver-location -------->| (every member)
///   |-- send_to(conn, error) --->|-- error ------------------>| (one connection)
/// ```
#[async_trait]
pub trait RealtimeTransport: Send + Sync + 'static {
    /// Publishes a message to every connection subscribed to `topic`.
    ///
    /// # Returns
    /// * `Ok(n)` - Number of connections the message was delivered to
    /// * `Err(EnvError::Transport)` - The transport itself is unusable
    async fn publish(&self, topic: &Topic, message: ServerMessage) -> Result<usize, EnvError>;

    /// Sends a message to one connection.
    ///
    /// # Returns
    /// * `Err(EnvError::UnknownConnection)` - The connection is gone
    async fn send_to(&self, connection: ConnectionId, message: ServerMessage) -> Result<(), EnvError>;

    /// Subscribes a connection to a topic. Joining twice is a no-op.
    async fn join(&self, connection: ConnectionId, topic: &Topic) -> Result<(), EnvError>;

    /// Unsubscribes a connection from a topic. Never fails.
    async fn leave(&self, connection: ConnectionId, topic: &Topic);
}
