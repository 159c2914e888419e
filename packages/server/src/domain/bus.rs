//! Broadcast bus port: group-addressed push over live connections.
//!
//! The usecase and ui layers depend on this trait; the websocket-backed
//! implementation lives in the infrastructure layer. Delivery is best-effort:
//! there is no durable queue, and a member that disconnects mid-broadcast
//! simply never receives the event.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, PushError, RoomId};

/// Channel used to push serialized messages toward one connection.
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// Group-addressed push abstraction over live transport connections.
#[async_trait]
pub trait BroadcastBus: Send + Sync {
    /// Register a connection's outbound channel.
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// Drop a connection's outbound channel and remove it from every group.
    async fn unregister_connection(&self, connection_id: &ConnectionId);

    /// Add a connection to a room group.
    async fn join_group(&self, connection_id: &ConnectionId, room_id: &RoomId);

    /// Remove a connection from a room group.
    async fn leave_group(&self, connection_id: &ConnectionId, room_id: &RoomId);

    /// Push a message to every member of a room group. Per-target failures
    /// are logged and skipped.
    async fn send_to_group(&self, room_id: &RoomId, message: &str);

    /// Push a message to a single connection.
    async fn send_to_caller(
        &self,
        connection_id: &ConnectionId,
        message: &str,
    ) -> Result<(), PushError>;

    /// Push a message to every group member except the given connection.
    async fn send_to_others(&self, connection_id: &ConnectionId, room_id: &RoomId, message: &str);
}
