//! Connection-to-room binding registry.
//!
//! A websocket connection carries no room context of its own; the binding is
//! established by the first successful join command and consulted by every
//! command after it. Removal returns the binding exactly once, so disconnect
//! cleanup runs at most once even when an explicit leave races the socket
//! closing.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::{ClientId, ConnectionId, RoomId};

/// What a live connection is bound to after joining a room.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionBinding {
    pub room_id: RoomId,
    pub client_id: ClientId,
}

/// Tracks which room and client each live connection belongs to.
#[derive(Default)]
pub struct ConnectionRegistry {
    bindings: Mutex<HashMap<ConnectionId, ConnectionBinding>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a room and client. A re-join overwrites the
    /// previous binding and returns it.
    pub async fn insert(
        &self,
        connection_id: ConnectionId,
        binding: ConnectionBinding,
    ) -> Option<ConnectionBinding> {
        self.bindings.lock().await.insert(connection_id, binding)
    }

    /// Look up the binding for a connection.
    pub async fn get(&self, connection_id: &ConnectionId) -> Option<ConnectionBinding> {
        self.bindings.lock().await.get(connection_id).cloned()
    }

    /// Remove and return the binding. Returns `None` when the connection was
    /// never bound or was already removed.
    pub async fn remove(&self, connection_id: &ConnectionId) -> Option<ConnectionBinding> {
        self.bindings.lock().await.remove(connection_id)
    }
}
